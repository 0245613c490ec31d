use thumbsnap::audio::Speaker;
use thumbsnap::capture::CaptureSession;
use thumbsnap::config::Config;
use thumbsnap::driver::FrameLoop;
use thumbsnap::gui::PreviewWindow;
use thumbsnap::hand::network::LandmarkNetwork;
use thumbsnap::persist::DiskStore;
use thumbsnap::video::webcam::{Webcam, WebcamOptions};

fn main() -> anyhow::Result<()> {
    thumbsnap::init_logger!();

    let config = Config::from_env()?;
    log::debug!("{config:?}");

    let network = LandmarkNetwork::load(&config.model_path, config.min_presence)?;
    let speaker = Speaker::open(&config.confirm_cue, &config.shutter_cue)?;
    let store = DiskStore::new(&config.output_dir)?;

    let mut options = WebcamOptions::default()
        .fps(config.webcam_fps)
        .mirror(config.mirror);
    if let Some(name) = &config.webcam_name {
        options = options.name(name);
    }
    if let Some(res) = config.webcam_resolution {
        options = options.resolution(res);
    }
    let webcam = Webcam::open(options)?;

    let mut frame_loop = FrameLoop::new(
        Box::new(webcam),
        Box::new(network),
        Box::new(PreviewWindow::new("thumbsnap")),
        Box::new(speaker),
        Box::new(store),
        CaptureSession::new(config.timing),
    )
    .clean_snapshots(config.clean_snapshots);
    frame_loop.run()
}
