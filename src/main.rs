use iced::widget::image::Handle;
use iced::widget::{button, column, container, horizontal_space, row, scrollable, text};
use iced::{Alignment, Element, Length, Task, Theme};
use std::path::{Path, PathBuf};

mod config;
mod credentials;
mod generation;
mod prompt;
mod state;
mod ui;

use config::Config;
use credentials::Credentials;
use generation::{GenerationClient, GenerationError};
use state::camera::{AspectRatio, CameraSettings, ImageSize};
use state::data::{decode_data_url, SessionSnapshot, SourceImage};
use state::library::{self, keys, Library};
use state::presets::Preset;
use state::session::{Action, Effect, GenerationFailure, Session, Status};
use ui::orbit::OrbitDelta;

/// File types offered by the upload picker; the format itself is sniffed
/// from the content after loading
const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "jfif", "webp", "gif", "bmp", "tif", "tiff", "avif", "ico", "tga",
    "qoi", "pnm", "pbm", "pgm", "ppm", "hdr", "exr", "dds",
];

/// Default file name offered when saving a render
const RENDER_FILE_STEM: &str = "viewshift_render";

/// Main application state
struct ViewShift {
    /// Pose collection, images and workflow status
    session: Session,
    /// The session database
    library: Library,
    /// API key for the generation service
    credentials: Credentials,
    client: GenerationClient,
    /// Text typed into the key prompt
    key_input: String,
    /// Decoded images, rebuilt only when the session's images change
    original_preview: Option<Handle>,
    generated_preview: Option<Handle>,
    /// Generated image shown full size instead of the workspace
    enlarged: bool,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    /// Background restore finished
    Restored(SessionSnapshot),

    // Credential prompt
    ApiKeyChanged(String),
    SubmitApiKey,
    SwitchApiKey,

    // Upload
    PickImage,
    ImageChosen(Option<PathBuf>),
    ImageLoaded(Result<SourceImage, String>),

    // Poses
    SelectPose(String),
    AddPose,
    RemovePose(String),

    // Active pose settings
    AzimuthChanged(i32),
    ElevationChanged(i32),
    ZoomChanged(f32),
    FovChanged(i32),
    DescriptionChanged(String),
    AspectRatioSelected(AspectRatio),
    ImageSizeSelected(ImageSize),
    ApplyPreset(&'static Preset),
    /// Drag on the orbit control
    Orbit(OrbitDelta),

    // Generation
    Generate,
    Generated(Result<String, GenerationFailure>),

    // Result
    /// Save the generated image to a file of the user's choice
    SaveGenerated,
    /// Where the render was written, `None` when the dialog was cancelled
    Saved(Result<Option<PathBuf>, String>),
    /// Switch between the workspace and the full-size result
    TogglePreview,

    // Reset
    ResetRequested,
    ResetConfirmed(bool),

    /// A background blob write finished
    Persisted(Result<(), String>),
}

impl ViewShift {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        let config = Config::from_env().unwrap_or_else(|e| {
            log::error!("Invalid configuration, using defaults: {}", e);
            Config::default()
        });

        let db_path = config.db_path.clone().unwrap_or_else(Library::default_path);
        let library = match Library::open(&db_path) {
            Ok(library) => library,
            Err(e) => {
                log::error!(
                    "Failed to open session database at {}: {}. Session will not be saved.",
                    db_path.display(),
                    e
                );
                // If this fails, we panic because SQLite itself is unusable
                Library::in_memory().expect("Failed to create in-memory session database.")
            }
        };

        let credentials = Credentials::new(config.api_key.clone());
        log::info!(
            "🎥 ViewShift starting (model {}, key {})",
            config.generation.model,
            if credentials.has_selected() { "from environment" } else { "not set" }
        );

        let restore = Task::perform(
            library::restore_async(library.path().map(|p| p.to_path_buf())),
            Message::Restored,
        );

        (
            ViewShift {
                session: Session::new(config.orbit),
                library,
                credentials,
                client: GenerationClient::new(config.generation, config.prompt),
                key_input: String::new(),
                original_preview: None,
                generated_preview: None,
                enlarged: false,
            },
            restore,
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Restored(snapshot) => {
                log::info!(
                    "Restored {} pose(s), source image: {}, generated image: {}",
                    snapshot.poses.len().max(1),
                    snapshot.original.is_some(),
                    snapshot.generated.is_some()
                );
                let effects = self.session.apply(Action::Restored {
                    snapshot,
                    has_credential: self.credentials.has_selected(),
                });
                self.refresh_previews();
                self.run_effects(effects)
            }

            Message::ApiKeyChanged(value) => {
                self.key_input = value;
                Task::none()
            }
            Message::SubmitApiKey => {
                if self.credentials.select(&self.key_input) {
                    self.key_input.clear();
                    log::info!("🔑 API key selected");
                    let effects = self.session.apply(Action::CredentialSupplied);
                    return self.run_effects(effects);
                }
                Task::none()
            }
            Message::SwitchApiKey => {
                let effects = self.session.apply(Action::CredentialRequested);
                self.run_effects(effects)
            }

            Message::PickImage => Task::perform(pick_image(), Message::ImageChosen),
            Message::ImageChosen(None) => Task::none(),
            Message::ImageChosen(Some(path)) => {
                if self.session.status() == Status::Uploading {
                    return Task::none();
                }
                let effects = self.session.apply(Action::UploadStarted);
                if self.session.status() != Status::Uploading {
                    return self.run_effects(effects);
                }
                self.refresh_previews();
                log::info!("📷 Loading {}", path.display());
                Task::batch([
                    self.run_effects(effects),
                    Task::perform(load_image_file(path), |result| {
                        Message::ImageLoaded(result.map_err(|e| e.to_string()))
                    }),
                ])
            }
            Message::ImageLoaded(result) => {
                let effects = self.session.apply(Action::UploadFinished(result));
                self.refresh_previews();
                self.run_effects(effects)
            }

            Message::SelectPose(id) => self.apply(Action::SelectPose(id)),
            Message::AddPose => self.apply(Action::AddPose),
            Message::RemovePose(id) => self.apply(Action::RemovePose(id)),

            Message::AzimuthChanged(value) => self.edit_active(|s| s.azimuth = value),
            Message::ElevationChanged(value) => self.edit_active(|s| s.elevation = value),
            Message::ZoomChanged(value) => self.edit_active(|s| s.zoom = value),
            Message::FovChanged(value) => self.edit_active(|s| s.fov = value),
            Message::DescriptionChanged(value) => {
                self.edit_active(|s| s.description = Some(value).filter(|d| !d.is_empty()))
            }
            Message::AspectRatioSelected(ratio) => self.edit_active(|s| s.aspect_ratio = ratio),
            Message::ImageSizeSelected(size) => self.edit_active(|s| s.image_size = size),
            Message::ApplyPreset(preset) => self.apply(Action::ApplyPreset(preset)),
            Message::Orbit(delta) => self.apply(Action::Orbit(delta)),

            Message::Generate => self.apply(Action::Generate),
            Message::Generated(result) => {
                match &result {
                    Ok(_) => log::info!("✅ New view generated"),
                    Err(GenerationFailure::Credential) => {
                        log::warn!("🔑 API key rejected, asking for a new one");
                        self.credentials.invalidate();
                    }
                    Err(GenerationFailure::Other(_)) => {}
                }
                let effects = self.session.apply(Action::GenerationFinished(result));
                self.refresh_previews();
                self.run_effects(effects)
            }

            Message::SaveGenerated => match self.session.generated() {
                Some(data_url) => Task::perform(save_generated(data_url.to_string()), |result| {
                    Message::Saved(result.map_err(|e| e.to_string()))
                }),
                None => Task::none(),
            },
            Message::Saved(Ok(Some(path))) => {
                log::info!("💾 Render saved to {}", path.display());
                Task::none()
            }
            Message::Saved(Ok(None)) => Task::none(),
            Message::Saved(Err(e)) => {
                log::error!("Failed to save render: {}", e);
                Task::none()
            }
            Message::TogglePreview => {
                self.enlarged = !self.enlarged && self.generated_preview.is_some();
                Task::none()
            }

            Message::ResetRequested => Task::perform(confirm_reset(), Message::ResetConfirmed),
            Message::ResetConfirmed(false) => Task::none(),
            Message::ResetConfirmed(true) => {
                log::info!("🧹 Resetting session");
                let effects = self.session.apply(Action::Reset);
                self.refresh_previews();
                self.run_effects(effects)
            }

            Message::Persisted(Ok(())) => Task::none(),
            Message::Persisted(Err(e)) => {
                log::error!("Failed to persist image: {}", e);
                Task::none()
            }
        }
    }

    fn apply(&mut self, action: Action) -> Task<Message> {
        let effects = self.session.apply(action);
        self.run_effects(effects)
    }

    /// Change one field of the active pose
    fn edit_active(&mut self, edit: impl FnOnce(&mut CameraSettings)) -> Task<Message> {
        let mut settings = self.session.poses().active().settings.clone();
        edit(&mut settings);
        self.apply(Action::UpdateActive(settings))
    }

    /// Carry out the work a session transition asked for
    fn run_effects(&mut self, effects: Vec<Effect>) -> Task<Message> {
        let tasks: Vec<Task<Message>> = effects
            .into_iter()
            .map(|effect| self.run_effect(effect))
            .collect();
        Task::batch(tasks)
    }

    fn run_effect(&mut self, effect: Effect) -> Task<Message> {
        match effect {
            Effect::PersistPoses { poses, active_id } => {
                if let Err(e) = self.library.save_poses(&poses, &active_id) {
                    log::error!("Failed to save poses: {}", e);
                }
                Task::none()
            }
            Effect::PersistOriginal(image) => {
                if let Err(e) = self.library.save_mime_type(&image.mime_type) {
                    log::error!("Failed to save MIME type: {}", e);
                }
                self.store_blob(keys::ORIGINAL_IMG, image.base64)
            }
            Effect::PersistGenerated(data_url) => self.store_blob(keys::GENERATED_IMG, data_url),
            Effect::DiscardGenerated => match self.library.path() {
                Some(path) => Task::perform(
                    library::delete_image_async(path.to_path_buf(), keys::GENERATED_IMG),
                    persisted,
                ),
                None => {
                    if let Err(e) = self.library.delete_image(keys::GENERATED_IMG) {
                        log::error!("Failed to discard generated image: {}", e);
                    }
                    Task::none()
                }
            },
            Effect::Generate { image, settings } => {
                let Some(api_key) = self.credentials.api_key().map(str::to_string) else {
                    return Task::done(Message::Generated(Err(GenerationFailure::Credential)));
                };
                let client = self.client.clone();
                Task::perform(
                    async move {
                        client
                            .generate(&api_key, &image, &settings)
                            .await
                            .map(|generated| generated.data_url())
                            .map_err(generation_failure)
                    },
                    Message::Generated,
                )
            }
            Effect::ClearStorage => {
                // Synchronous, so blob writes from a later upload always land after it
                if let Err(e) = self.library.clear_all() {
                    log::error!("Failed to clear session storage: {}", e);
                }
                Task::none()
            }
        }
    }

    /// Write a blob off the UI thread, or inline for an in-memory database
    fn store_blob(&self, key: &'static str, data: String) -> Task<Message> {
        match self.library.path() {
            Some(path) => Task::perform(library::save_image_async(path.to_path_buf(), key, data), persisted),
            None => {
                if let Err(e) = self.library.save_image(key, &data) {
                    log::error!("Failed to save {}: {}", key, e);
                }
                Task::none()
            }
        }
    }

    fn refresh_previews(&mut self) {
        self.original_preview = self
            .session
            .original()
            .and_then(SourceImage::bytes)
            .map(Handle::from_bytes);
        self.generated_preview = self
            .session
            .generated()
            .and_then(decode_data_url)
            .map(|(_, bytes)| Handle::from_bytes(bytes));
        if self.generated_preview.is_none() {
            self.enlarged = false;
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        match self.session.status() {
            Status::Initializing => container(text("Restoring session...").size(16))
                .width(Length::Fill)
                .height(Length::Fill)
                .center_x(Length::Fill)
                .center_y(Length::Fill)
                .into(),
            Status::NeedsCredential => ui::controls::credential_prompt(&self.key_input, self.session.error()),
            _ => match (&self.generated_preview, self.enlarged) {
                (Some(handle), true) => ui::controls::enlarged_preview(handle),
                _ => self.workspace(),
            },
        }
    }

    fn workspace(&self) -> Element<Message> {
        let status = self.session.status();
        let generating = status == Status::Generating;
        let settings = &self.session.poses().active().settings;

        let header = row![
            text("ViewShift").size(28),
            horizontal_space(),
            button(text("Switch key").size(13))
                .on_press_maybe((!generating).then_some(Message::SwitchApiKey))
                .style(button::secondary),
            button(text("Reset").size(13))
                .on_press(Message::ResetRequested)
                .style(button::danger),
        ]
        .spacing(8)
        .align_y(Alignment::Center);

        let generate_label = if generating { "Generating..." } else { "Generate View" };
        let generate = button(text(generate_label).size(16))
            .on_press_maybe(self.session.controls_enabled().then_some(Message::Generate))
            .padding(12)
            .width(Length::Fill);

        let camera_column = column![
            ui::controls::pose_tabs(self.session.poses()),
            ui::controls::orbit_panel(self.session.poses(), !self.session.controls_enabled()),
            ui::controls::preset_grid(),
        ]
        .spacing(12)
        .width(Length::FillPortion(1));

        let settings_column = column![
            ui::controls::sliders(settings),
            ui::controls::description_input(settings),
            ui::controls::output_settings(settings),
            generate,
        ]
        .spacing(16)
        .width(Length::FillPortion(1));

        let mut content = column![
            header,
            ui::controls::image_panels(
                self.original_preview.as_ref(),
                self.generated_preview.as_ref(),
                generating,
                status == Status::Uploading,
            ),
            row![camera_column, settings_column].spacing(24),
        ]
        .spacing(20)
        .padding(24);

        if let Some(error) = self.session.error() {
            content = content.push(text(error).size(14).style(text::danger));
        }

        scrollable(content).into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    iced::application("ViewShift", ViewShift::update, ViewShift::view)
        .theme(ViewShift::theme)
        .centered()
        .run_with(ViewShift::new)
}

fn persisted(result: state::library::StorageResult<()>) -> Message {
    Message::Persisted(result.map_err(|e| e.to_string()))
}

/// Reduce a generation error to what the session distinguishes
fn generation_failure(error: GenerationError) -> GenerationFailure {
    if error.is_credential() {
        GenerationFailure::Credential
    } else {
        GenerationFailure::Other(error.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
enum UploadError {
    #[error("could not read image file: {0}")]
    Io(#[from] std::io::Error),

    #[error("unrecognized image format: {0}")]
    Format(#[from] image::ImageError),
}

#[derive(Debug, thiserror::Error)]
enum SaveError {
    #[error("could not write image file: {0}")]
    Io(#[from] std::io::Error),

    #[error("generated image is not a base64 data URL")]
    InvalidDataUrl,
}

/// Show the native file picker, filtered to image files
async fn pick_image() -> Option<PathBuf> {
    rfd::AsyncFileDialog::new()
        .set_title("Select a reference image")
        .add_filter("Images", IMAGE_EXTENSIONS)
        .pick_file()
        .await
        .map(|file| file.path().to_path_buf())
}

/// Read an image file and encode it for the session.
///
/// The MIME type comes from the file content, not its extension.
async fn load_image_file(path: PathBuf) -> Result<SourceImage, UploadError> {
    let bytes = tokio::fs::read(&path).await?;
    let format = image::guess_format(&bytes)?;
    Ok(SourceImage::from_bytes(&bytes, format.to_mime_type()))
}

/// File extension matching a MIME type, `png` when unknown
fn extension_for(mime_type: &str) -> &'static str {
    image::ImageFormat::from_mime_type(mime_type)
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("png")
}

/// Ask where to save the generated image, then write it there
async fn save_generated(data_url: String) -> Result<Option<PathBuf>, SaveError> {
    let (mime_type, _) = decode_data_url(&data_url).ok_or(SaveError::InvalidDataUrl)?;
    let extension = extension_for(&mime_type);

    let Some(file) = rfd::AsyncFileDialog::new()
        .set_title("Save rendered view")
        .set_file_name(format!("{}.{}", RENDER_FILE_STEM, extension))
        .add_filter("Image", &[extension])
        .save_file()
        .await
    else {
        return Ok(None);
    };

    let path = file.path().to_path_buf();
    write_data_url(&path, &data_url).await?;
    Ok(Some(path))
}

/// Decode a base64 data URL and write the raw image bytes to `path`
async fn write_data_url(path: &Path, data_url: &str) -> Result<(), SaveError> {
    let (_, bytes) = decode_data_url(data_url).ok_or(SaveError::InvalidDataUrl)?;
    tokio::fs::write(path, bytes).await?;
    Ok(())
}

/// Ask before wiping the session
async fn confirm_reset() -> bool {
    let result = rfd::AsyncMessageDialog::new()
        .set_level(rfd::MessageLevel::Warning)
        .set_title("Reset session")
        .set_description("Discard all poses and images and start over?")
        .set_buttons(rfd::MessageButtons::YesNo)
        .show()
        .await;
    matches!(result, rfd::MessageDialogResult::Yes)
}
