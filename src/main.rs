fn main() {
    if let Err(err) = tempo_extract::run() {
        eprintln!("error: {err:#}");
        std::process::exit(tempo_extract::error::exit_code(&err));
    }
}
