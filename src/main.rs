use std::process::ExitCode;

fn main() -> ExitCode {
    match fuel_series::app::run() {
        Ok(status) => ExitCode::from(status.exit_code()),
        Err(err) => {
            eprintln!("{err}");
            ExitCode::from(err.exit_code())
        }
    }
}
