fn main() {
    let args: Vec<String> = std::env::args().collect();
    if let Err(err) = rotgain::run(&args) {
        eprintln!("rotgain: {}", err);
        std::process::exit(1);
    }
}
