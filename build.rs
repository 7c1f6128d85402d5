fn main() {
    // ESP-IDF environment is only needed for Xtensa builds; host builds and
    // tests skip it. TARGET is the compile target, not the build host.
    let target = std::env::var("TARGET").unwrap_or_default();
    if target.starts_with("xtensa-") {
        embuild::espidf::sysenv::output();
    }
}
