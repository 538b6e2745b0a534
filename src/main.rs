fn main() {
    // Load .env file if present (for development convenience)
    let _ = dotenvy::dotenv();

    if let Err(e) = memo_lib::run() {
        eprintln!("thirty-second-memo: {}", e);
        std::process::exit(1);
    }
}
