use {
    anyhow::Result,
    candle_core::Device,
    clap::Parser,
    ddpg_rl::{
        agents::DDPG,
        cli::{
            run_from_args,
            Args,
            Env,
        },
        configs::DDPG_Config,
        envs::{
            CruiseEnv,
            CruiseEnvConfig,
            PendulumConfig,
            PendulumEnv,
        },
        logging::setup_logging,
    },
    std::sync::atomic::AtomicBool,
};


fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(level) = args.log.level() {
        setup_logging(
            &"debug.log",
            Some(level),
            Some(level),
        )?;
    }

    let device = Device::Cpu;
    let stop = AtomicBool::new(false);

    match args.env {
        Env::Cruise => run_from_args::<DDPG, CruiseEnv, _, _>(
            &args,
            CruiseEnvConfig::default(),
            DDPG_Config::cruise(),
            &stop,
            &device,
        ),
        Env::Pendulum => run_from_args::<DDPG, PendulumEnv, _, _>(
            &args,
            PendulumConfig::default(),
            DDPG_Config::pendulum(),
            &stop,
            &device,
        ),
    }
}
