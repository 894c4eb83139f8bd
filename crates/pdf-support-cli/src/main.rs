use std::process;

fn main() {
    match pdf_support_cli::run() {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("pdf-support error: {err:#}");
            process::exit(1);
        }
    }
}
