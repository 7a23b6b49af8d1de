use energy_influx::utils::logger;
use energy_influx::{Launcher, LauncherConfig};

fn main() {
    logger::init_launcher_logger();

    let launcher = Launcher::system(LauncherConfig::default());
    let outcome = launcher.run();
    tracing::debug!("Launcher finished: {:?}", outcome);
}
