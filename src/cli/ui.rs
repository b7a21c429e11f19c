use owo_colors::OwoColorize;

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message.green());
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("⚠️  {}", message.yellow());
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message.red());
}
