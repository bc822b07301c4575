use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let code = durablequeue::boot::run().await;
    ExitCode::from(code as u8)
}
