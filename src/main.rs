fn main() -> std::process::ExitCode {
    idextract_lib::run()
}
