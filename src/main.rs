fn main() {
    if let Err(err) = maquette::cli::main() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
