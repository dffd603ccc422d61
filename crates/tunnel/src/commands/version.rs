pub fn execute() {
    println!("tunnel {}", env!("CARGO_PKG_VERSION"));
}
