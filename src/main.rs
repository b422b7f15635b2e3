fn main() {
    tremolofx::cli::run_cli();
}
