fn main() -> Result<(), Box<dyn std::error::Error>> {
    devochat::cli::main()
}
