fn main() {
    if let Err(err) = hr_sheet::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
