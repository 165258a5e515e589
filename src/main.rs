use kexplode::ui::output;

fn main() {
    if let Err(err) = kexplode::cli::run() {
        output::error(format!("{:#}", err));
        std::process::exit(1);
    }
}
