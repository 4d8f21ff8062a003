// Error handling tests

use inkstamp::error::AppError;
use inkstamp::suggest::SuggestError;
use inkstamp::watermark::WatermarkError;

#[test]
fn test_app_error_wraps_each_subsystem() {
    // Test: AppError has one variant per failure domain (Config, Image, Suggest, Io)

    // Scenario 1: Config errors carry their message
    let err = AppError::Config("watermark: opacity must be a finite value".to_string());
    assert!(matches!(err, AppError::Config(ref msg) if msg.starts_with("watermark:")));

    // Scenario 2: Watermark errors convert with ?
    fn decode() -> Result<(), AppError> {
        let result: Result<(), WatermarkError> =
            Err(WatermarkError::LimitExceeded("too many pixels".to_string()));
        result?;
        Ok(())
    }
    let err = decode().unwrap_err();
    assert!(matches!(err, AppError::Image(WatermarkError::LimitExceeded(_))));
    assert_eq!(
        err.to_string(),
        "Image error: Image exceeds limits: too many pixels"
    );

    // Scenario 3: Suggestion errors convert with ?
    fn suggest() -> Result<(), AppError> {
        let result: Result<(), SuggestError> = Err(SuggestError::Busy);
        result?;
        Ok(())
    }
    assert!(matches!(
        suggest().unwrap_err(),
        AppError::Suggest(SuggestError::Busy)
    ));

    // Scenario 4: I/O errors convert with ?
    fn read() -> Result<Vec<u8>, AppError> {
        Ok(std::fs::read("/nonexistent/inkstamp/input.png")?)
    }
    assert!(matches!(read().unwrap_err(), AppError::Io(_)));
}

#[test]
fn test_app_error_works_with_anyhow() {
    // The CLI attaches context with anyhow; the chain must keep the cause
    let err = anyhow::Error::new(AppError::Config("bad".to_string())).context("Failed to load");
    assert_eq!(err.to_string(), "Failed to load");
    assert_eq!(err.root_cause().to_string(), "Configuration error: bad");
}
