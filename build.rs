fn main() {
    // ESP-IDF link arguments are only needed for the firmware target.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
