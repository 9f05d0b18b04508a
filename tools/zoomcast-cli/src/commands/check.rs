//! Check that the required GStreamer elements are installed.

use gstreamer as gst;

const REQUIRED_ELEMENTS: &[&str] = &[
    "appsrc",
    "videoconvert",
    "x264enc",
    "h264parse",
    "audioconvert",
    "avenc_aac",
    "aacparse",
    "mp4mux",
    "filesink",
];

pub fn run() -> anyhow::Result<()> {
    gst::init()?;
    println!("GStreamer {}", gst::version_string());
    println!();

    let mut missing = 0;
    for name in REQUIRED_ELEMENTS {
        let found = gst::ElementFactory::find(name).is_some();
        println!("  {name}: {}", if found { "ok" } else { "MISSING" });
        if !found {
            missing += 1;
        }
    }

    println!();
    if missing == 0 {
        println!("All writer elements available.");
        Ok(())
    } else {
        anyhow::bail!("{missing} required element(s) missing; install the GStreamer good/bad/libav plugin sets")
    }
}
