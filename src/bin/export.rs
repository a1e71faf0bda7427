use trimax::*;

// Usage: export <blueprint.bin> <out.json>
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("usage: {} <blueprint.bin> <out.json>", args[0]);
        std::process::exit(2);
    }
    let result = Blueprint::load(&args[1]).and_then(|blueprint| blueprint.write_json(&args[2]));
    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
