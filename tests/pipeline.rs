use std::{path::PathBuf, sync::Mutex};

use adgauge::{
    BatchRunner, ConfigSource, CreativeStatus, FsFontStore, FsImageFetch, GaugeError, GaugeResult,
    GoalSource, RawEntry, UploadSink, output_path,
};
use image::{Rgba, RgbaImage};

const BLUE: [u8; 4] = [0, 0, 200, 255];
const GREEN: [u8; 4] = [0, 200, 0, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];
const GOLD_TEXT: [u8; 4] = [0x9A, 0x7D, 0x2E, 255];

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "adgauge_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn write_png(path: &PathBuf, w: u32, h: u32, color: [u8; 4]) {
    RgbaImage::from_pixel(w, h, Rgba(color)).save(path).unwrap();
}

struct Fixture {
    root: PathBuf,
    assets: PathBuf,
    fonts: PathBuf,
    out: PathBuf,
}

impl Fixture {
    fn new(name: &str) -> Self {
        let root = temp_dir(name);
        let assets = root.join("assets");
        let fonts = root.join("fonts");
        let out = root.join("out");
        std::fs::create_dir_all(&assets).unwrap();
        std::fs::create_dir_all(&fonts).unwrap();
        Self {
            root,
            assets,
            fonts,
            out,
        }
    }

    fn fetcher(&self) -> FsImageFetch {
        FsImageFetch::new(&self.assets)
    }

    fn fonts(&self) -> FsFontStore {
        FsFontStore::new(&self.fonts, "Georgia.ttf")
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.root).ok();
    }
}

struct VecSource(Vec<RawEntry>);

impl ConfigSource for VecSource {
    fn get_all(&self) -> GaugeResult<Vec<RawEntry>> {
        Ok(self.0.clone())
    }
}

struct FixedGoal(f64);

impl GoalSource for FixedGoal {
    fn percent(&self) -> GaugeResult<f64> {
        Ok(self.0)
    }
}

#[derive(Default)]
struct RecordingSink {
    calls: Mutex<Vec<String>>,
    fail_for: Option<String>,
}

impl RecordingSink {
    fn failing_for(creative_id: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_for: Some(creative_id.to_string()),
        }
    }

    fn uploaded(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl UploadSink for RecordingSink {
    fn upload(&self, creative_id: &str, image: &[u8]) -> GaugeResult<()> {
        assert!(!image.is_empty());
        if self.fail_for.as_deref() == Some(creative_id) {
            return Err(GaugeError::upload(format!("sink rejected '{creative_id}'")));
        }
        self.calls.lock().unwrap().push(creative_id.to_string());
        Ok(())
    }
}

fn bar_entry(creative: &str) -> RawEntry {
    RawEntry::new(format!("{creative}_bar"))
        .with("creative_id", creative)
        .with("item_type", "progress_bar")
        .with("image_url", "bar.png")
}

fn bg_entry(creative: &str, image: &str, min: &str, max: &str) -> RawEntry {
    RawEntry::new(format!("{creative}_{image}"))
        .with("creative_id", creative)
        .with("item_type", "bg_image")
        .with("image_url", image)
        .with("min_percentage", min)
        .with("max_percentage", max)
}

#[test]
fn batch_composites_text_and_uploads() {
    init_tracing();
    let fx = Fixture::new("happy_path");
    write_png(&fx.assets.join("low.png"), 40, 20, BLUE);
    write_png(&fx.assets.join("high.png"), 40, 20, GREEN);
    write_png(&fx.assets.join("bar.png"), 10, 4, [0, 0, 0, 0]);
    // present but unparseable: the badge must degrade to the built-in face
    std::fs::write(fx.fonts.join("Georgia.ttf"), b"not a real font").unwrap();

    let entries = vec![
        bar_entry("gold"),
        bg_entry("gold", "low.png", "0", "50"),
        bg_entry("gold", "high.png", "50", "100")
            .with("x_offset", "5")
            .with("y_offset", "5"),
        RawEntry::new("gold_prefs")
            .with("creative_id", "gold")
            .with("item_type", "font_prefs")
            .with("y_offset", "6")
            .with("x_offset_len", "40")
            .with("y_offset_len", "14"),
    ];

    let fetcher = fx.fetcher();
    let fonts = fx.fonts();
    let runner = BatchRunner::new(&fetcher, &fonts, &fx.out);
    let sink = RecordingSink::default();
    let reports = runner
        .run(&VecSource(entries), &FixedGoal(0.0), &sink, Some(73.0))
        .unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].status, CreativeStatus::Uploaded);
    assert!(!reports[0].fallback_background);
    assert_eq!(sink.uploaded(), ["gold"]);

    let path = output_path(&fx.out, "gold");
    assert_eq!(reports[0].output.as_deref(), Some(path.as_path()));
    let img = image::open(&path).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (40, 20));

    // 73% picked the upper variant; the bar's transparent filled span shows it
    assert_eq!(img.get_pixel(5, 5).0, GREEN);
    // unfilled span of the bar was masked white and pasted at the bg offset
    assert_eq!(img.get_pixel(12, 5).0, WHITE);
    assert_eq!(img.get_pixel(14, 8).0, WHITE);
    // the percentage badge landed somewhere in the default color
    assert!(img.pixels().any(|p| p.0 == GOLD_TEXT));
}

#[test]
fn incomplete_creative_is_reported_and_siblings_still_render() {
    init_tracing();
    let fx = Fixture::new("exclusion");
    write_png(&fx.assets.join("bg.png"), 8, 8, BLUE);
    write_png(&fx.assets.join("bar.png"), 4, 2, [0, 0, 0, 0]);

    let entries = vec![
        // background without a progress_bar section
        bg_entry("broken", "bg.png", "0", "100"),
        bar_entry("ok"),
        bg_entry("ok", "bg.png", "0", "100"),
    ];

    let fetcher = fx.fetcher();
    let fonts = fx.fonts();
    let runner = BatchRunner::new(&fetcher, &fonts, &fx.out);
    let sink = RecordingSink::default();
    let reports = runner
        .run(&VecSource(entries), &FixedGoal(0.0), &sink, Some(50.0))
        .unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].creative_id, "broken");
    assert_eq!(reports[0].status, CreativeStatus::Excluded);
    assert!(reports[0].output.is_none());
    assert!(!output_path(&fx.out, "broken").exists());

    assert_eq!(reports[1].creative_id, "ok");
    assert_eq!(reports[1].status, CreativeStatus::Uploaded);
    assert!(output_path(&fx.out, "ok").exists());
    assert_eq!(sink.uploaded(), ["ok"]);
}

#[test]
fn upload_failure_does_not_abort_siblings() {
    let fx = Fixture::new("upload_failure");
    write_png(&fx.assets.join("bg.png"), 8, 8, BLUE);
    write_png(&fx.assets.join("bar.png"), 4, 2, [0, 0, 0, 0]);

    let mut entries = Vec::new();
    for creative in ["alpha", "beta"] {
        entries.push(bar_entry(creative));
        entries.push(bg_entry(creative, "bg.png", "0", "100"));
    }

    let fetcher = fx.fetcher();
    let fonts = fx.fonts();
    let runner = BatchRunner::new(&fetcher, &fonts, &fx.out);
    let sink = RecordingSink::failing_for("alpha");
    let reports = runner
        .run(&VecSource(entries), &FixedGoal(0.0), &sink, Some(10.0))
        .unwrap();

    assert_eq!(reports[0].creative_id, "alpha");
    assert_eq!(reports[0].status, CreativeStatus::UploadFailed);
    // the image was still persisted before the sink rejected it
    assert!(output_path(&fx.out, "alpha").exists());

    assert_eq!(reports[1].creative_id, "beta");
    assert_eq!(reports[1].status, CreativeStatus::Uploaded);
    assert_eq!(sink.uploaded(), ["beta"]);
}

#[test]
fn unmatched_percentage_renders_with_last_variant_and_flags_it() {
    let fx = Fixture::new("fallback");
    write_png(&fx.assets.join("bg.png"), 8, 8, BLUE);
    write_png(&fx.assets.join("bar.png"), 4, 2, [0, 0, 0, 0]);

    let entries = vec![
        bar_entry("gap"),
        bg_entry("gap", "bg.png", "0", "30"),
    ];

    let fetcher = fx.fetcher();
    let fonts = fx.fonts();
    let runner = BatchRunner::new(&fetcher, &fonts, &fx.out);
    let sink = RecordingSink::default();
    let reports = runner
        .run(&VecSource(entries), &FixedGoal(0.0), &sink, Some(80.0))
        .unwrap();

    assert_eq!(reports[0].status, CreativeStatus::Uploaded);
    assert!(reports[0].fallback_background);
    assert!(output_path(&fx.out, "gap").exists());
}

#[test]
fn missing_asset_fails_only_that_creative() {
    let fx = Fixture::new("missing_asset");
    write_png(&fx.assets.join("bg.png"), 8, 8, BLUE);
    write_png(&fx.assets.join("bar.png"), 4, 2, [0, 0, 0, 0]);

    let entries = vec![
        bar_entry("ghost"),
        bg_entry("ghost", "nowhere.png", "0", "100"),
        bar_entry("solid"),
        bg_entry("solid", "bg.png", "0", "100"),
    ];

    let fetcher = fx.fetcher();
    let fonts = fx.fonts();
    let runner = BatchRunner::new(&fetcher, &fonts, &fx.out);
    let sink = RecordingSink::default();
    let reports = runner
        .run(&VecSource(entries), &FixedGoal(0.0), &sink, Some(20.0))
        .unwrap();

    assert_eq!(reports[0].creative_id, "ghost");
    assert_eq!(reports[0].status, CreativeStatus::BuildFailed);
    assert!(reports[0].output.is_none());

    assert_eq!(reports[1].creative_id, "solid");
    assert_eq!(reports[1].status, CreativeStatus::Uploaded);
}

#[test]
fn goal_source_supplies_percentage_when_omitted() {
    let fx = Fixture::new("goal_source");
    write_png(&fx.assets.join("low.png"), 8, 8, BLUE);
    write_png(&fx.assets.join("high.png"), 8, 8, GREEN);
    write_png(&fx.assets.join("bar.png"), 4, 2, [0, 0, 0, 0]);

    let entries = vec![
        bar_entry("goal"),
        bg_entry("goal", "low.png", "0", "50"),
        bg_entry("goal", "high.png", "50", "100"),
    ];

    let fetcher = fx.fetcher();
    let fonts = fx.fonts();
    let runner = BatchRunner::new(&fetcher, &fonts, &fx.out);
    let sink = RecordingSink::default();
    let reports = runner
        .run(&VecSource(entries), &FixedGoal(55.0), &sink, None)
        .unwrap();

    assert_eq!(reports[0].status, CreativeStatus::Uploaded);
    let img = image::open(output_path(&fx.out, "goal")).unwrap().to_rgba8();
    // 55% from the goal source picked the upper variant
    assert_eq!(img.get_pixel(0, 0).0, GREEN);
}
