use std::path::Path;
use trimax::*;

// Usage: train [params.toml]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> SolverResult<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_PATH.to_string());
    let config = if Path::new(&path).exists() {
        Config::load(&path)?
    } else {
        log::warn!("No config at {}, using defaults", path);
        Config::default()
    };
    log::info!("{:?}", config);

    let outputs = [Some(&config.blueprint_path), config.nodes_path.as_ref(), config.json_path.as_ref()];
    for output in outputs.into_iter().flatten() {
        if let Some(dir) = Path::new(output).parent() {
            std::fs::create_dir_all(dir).map_err(|e| SolverError::io(output, e))?;
        }
    }

    let trainer = Trainer::new(config.clone());
    if config.warm_start {
        match &config.nodes_path {
            Some(nodes_path) if Path::new(nodes_path).exists() => {
                trainer.nodes().merge(load_nodes(nodes_path)?);
            }
            _ => log::warn!("Nothing to warm start from, training from scratch"),
        }
    }

    let blueprint = trainer.train(config.train_iters)?;
    blueprint.save(&config.blueprint_path)?;
    if let Some(json_path) = &config.json_path {
        blueprint.write_json(json_path)?;
    }
    Ok(())
}
