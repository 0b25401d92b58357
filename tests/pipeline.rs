use anyhow::Result;
use async_trait::async_trait;
use facecloak::{
    BackendState, Config, FaceModel, FaceRegion, ModelManager, ModelSource,
    ObfuscationOrchestrator, ObfuscationPass, Phase, PixelBuffer,
};
use image::RgbImage;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SKIN: [u8; 4] = [200, 180, 160, 255];

enum Script {
    Detect(Vec<FaceRegion>),
    Fail,
    WaitFor(mpsc::Receiver<()>, Vec<FaceRegion>),
}

struct ScriptedModel(Script);

impl FaceModel for ScriptedModel {
    fn detect(&mut self, _frame: &RgbImage) -> Result<Vec<FaceRegion>> {
        match &self.0 {
            Script::Detect(regions) => Ok(regions.clone()),
            Script::Fail => anyhow::bail!("inference backend crashed"),
            Script::WaitFor(release, regions) => {
                release.recv()?;
                Ok(regions.clone())
            }
        }
    }

    fn input_size(&self) -> (u32, u32) {
        (640, 640)
    }
}

/// Hands out a prepared model exactly once
struct ScriptedSource(Mutex<Option<Script>>);

impl ScriptedSource {
    fn new(script: Script) -> Arc<dyn ModelSource> {
        Arc::new(Self(Mutex::new(Some(script))))
    }
}

#[async_trait]
impl ModelSource for ScriptedSource {
    async fn load(&self) -> Result<Box<dyn FaceModel>> {
        let script = self
            .0
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| anyhow::anyhow!("scripted model already taken"))?;
        Ok(Box::new(ScriptedModel(script)))
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

fn orchestrator(source: Option<Arc<dyn ModelSource>>) -> ObfuscationOrchestrator {
    orchestrator_with(source, Config::default())
}

fn orchestrator_with(source: Option<Arc<dyn ModelSource>>, config: Config) -> ObfuscationOrchestrator {
    let models = Arc::new(ModelManager::new(source, config.model.padding));
    ObfuscationOrchestrator::new(models, &config)
}

/// Config whose blur schedule is rejected, so every region goes to the fallback
fn broken_schedule(fallback_passes: u32) -> Config {
    let mut config = Config::default();
    config.obfuscation.passes = vec![ObfuscationPass::Gaussian { radius: 1 }];
    config.obfuscation.fallback_passes = fallback_passes;
    config
}

fn checkerboard() -> PixelBuffer {
    let mut buffer = frame();
    for y in 0..480 {
        for x in 0..640 {
            if (x / 4 + y / 4) % 2 == 0 {
                buffer.put_pixel(x, y, [20, 30, 40, 255]);
            }
        }
    }
    buffer
}

fn frame() -> PixelBuffer {
    PixelBuffer::filled(640, 480, SKIN).unwrap()
}

fn face(confidence: f32) -> FaceRegion {
    FaceRegion::new(300, 50, 100, 100, confidence)
}

#[tokio::test]
async fn confident_face_is_obscured_with_padding() {
    let orchestrator = orchestrator(Some(ScriptedSource::new(Script::Detect(vec![face(0.9)]))));

    let result = orchestrator.obfuscate(frame()).await.unwrap();

    assert!(result.any_region_transformed);
    assert_eq!(orchestrator.models().state(), BackendState::Ready);

    // Padded box is x 260..440, y 10..190
    let buffer = &result.buffer;
    for (x, y) in [(260, 10), (439, 10), (260, 189), (439, 189), (350, 100)] {
        assert_ne!(buffer.pixel(x, y), SKIN, "({x},{y}) should be obscured");
    }
    for (x, y) in [(259, 10), (440, 10), (260, 190), (350, 9), (0, 0), (639, 479)] {
        assert_eq!(buffer.pixel(x, y), SKIN, "({x},{y}) should be untouched");
    }
    assert_eq!(orchestrator.phase(), Phase::Idle);
}

#[tokio::test]
async fn unavailable_model_leaves_buffer_untouched() {
    let orchestrator = orchestrator(None);

    let result = orchestrator.obfuscate(frame()).await.unwrap();

    assert!(!result.any_region_transformed);
    assert_eq!(orchestrator.models().state(), BackendState::Unavailable);
    assert_eq!(result.buffer.data(), frame().data());
}

#[tokio::test]
async fn low_confidence_face_is_not_acted_upon() {
    let orchestrator = orchestrator(Some(ScriptedSource::new(Script::Detect(vec![face(0.4)]))));

    let result = orchestrator.obfuscate(frame()).await.unwrap();

    assert!(!result.any_region_transformed);
    assert_eq!(result.buffer.data(), frame().data());
}

#[tokio::test]
async fn detection_error_reads_as_no_faces() {
    let orchestrator = orchestrator(Some(ScriptedSource::new(Script::Fail)));

    let result = orchestrator.obfuscate(frame()).await.unwrap();

    assert!(!result.any_region_transformed);
    assert_eq!(result.buffer.data(), frame().data());
    assert_eq!(orchestrator.phase(), Phase::Idle);
}

#[tokio::test]
async fn only_confident_faces_among_several_are_obscured() {
    let faces = vec![
        FaceRegion::new(40, 200, 60, 60, 0.95),
        FaceRegion::new(500, 300, 60, 60, 0.2),
    ];
    let orchestrator = orchestrator(Some(ScriptedSource::new(Script::Detect(faces))));

    let result = orchestrator.obfuscate(frame()).await.unwrap();

    assert!(result.any_region_transformed);
    assert_ne!(result.buffer.pixel(70, 230), SKIN);
    assert_eq!(result.buffer.pixel(530, 330), SKIN);
}

#[tokio::test]
async fn face_partly_outside_frame_is_clamped() {
    let faces = vec![FaceRegion::new(-30, -30, 80, 80, 0.9)];
    let orchestrator = orchestrator(Some(ScriptedSource::new(Script::Detect(faces))));

    let result = orchestrator.obfuscate(frame()).await.unwrap();

    assert!(result.any_region_transformed);
    assert_ne!(result.buffer.pixel(0, 0), SKIN);
}

#[tokio::test]
async fn region_obscured_by_fallback_counts_as_transformed() {
    let orchestrator = orchestrator_with(
        Some(ScriptedSource::new(Script::Detect(vec![face(0.9)]))),
        broken_schedule(3),
    );
    let original = checkerboard();

    let result = orchestrator.obfuscate(original.clone()).await.unwrap();

    assert!(result.any_region_transformed);
    assert_ne!(result.buffer.pixel(350, 100), original.pixel(350, 100));
    assert_eq!(result.buffer.pixel(0, 300), original.pixel(0, 300));
}

#[tokio::test]
async fn region_left_untouched_when_fallback_also_fails() {
    let orchestrator = orchestrator_with(
        Some(ScriptedSource::new(Script::Detect(vec![face(0.9)]))),
        broken_schedule(0),
    );
    let original = checkerboard();

    let result = orchestrator.obfuscate(original.clone()).await.unwrap();

    assert!(!result.any_region_transformed);
    assert_eq!(result.buffer.data(), original.data());
    assert_eq!(orchestrator.phase(), Phase::Idle);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_capture_is_rejected_as_busy() {
    let (release, wait) = mpsc::channel();
    let orchestrator = Arc::new(orchestrator(Some(ScriptedSource::new(Script::WaitFor(
        wait,
        vec![face(0.9)],
    )))));

    let first = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.obfuscate(frame()).await })
    };

    while orchestrator.phase() != Phase::Detecting {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let mut second = PixelBuffer::filled(32, 32, [1, 2, 3, 255]).unwrap();
    second.put_pixel(5, 5, [9, 9, 9, 9]);
    let busy = orchestrator.obfuscate(second.clone()).await.unwrap_err();
    assert_eq!(busy.buffer.data(), second.data());

    release.send(()).unwrap();
    let result = first.await.unwrap().unwrap();
    assert!(result.any_region_transformed);
    assert_eq!(orchestrator.phase(), Phase::Idle);

    // Accepted again once the first call is done
    drop(release);
    assert!(orchestrator.obfuscate(second).await.is_ok());
}
