use tagdist_lpp::plot::{parse_cli, run};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let config = parse_cli();
    if let Some(abs) = run(&config)? {
        println!("[INFO] Saved plot -> {}", abs.display());
    }
    Ok(())
}
