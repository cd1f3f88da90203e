fn main() {
    if let Err(e) = clinic_lib::run() {
        eprintln!("clinic: {e}");
        std::process::exit(1);
    }
}
