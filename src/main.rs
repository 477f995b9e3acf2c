fn main() {
    #[cfg(feature = "logging")]
    env_logger::init();

    let config = mila_chess::config::EngineConfig::default();
    mila_chess::uci::run(config);
}
