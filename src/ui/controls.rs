/// View builders for the camera panels
///
/// Each function renders one part of the main screen from the session state
/// and emits `Message`s; none of them hold state of their own.
use iced::widget::image::Handle;
use iced::widget::{
    button, canvas, column, container, horizontal_space, mouse_area, row, slider, text, text_input,
    Column, Image, Row,
};
use iced::{Alignment, ContentFit, Element, Length, Pixels};
use iced_aw::Wrap;

use crate::state::camera::{
    AspectRatio, CameraSettings, ImageSize, AZIMUTH_RANGE, ELEVATION_RANGE, FOV_RANGE, ZOOM_RANGE,
};
use crate::state::poses::PoseStore;
use crate::state::presets::PRESETS;
use crate::ui::orbit::OrbitControl;
use crate::Message;

const PANEL_SPACING: f32 = 12.0;

/// Original and generated image side by side
pub fn image_panels<'a>(
    original: Option<&Handle>,
    generated: Option<&Handle>,
    generating: bool,
    uploading: bool,
) -> Element<'a, Message> {
    let original_panel: Element<'a, Message> = match original {
        Some(handle) => Image::new(handle.clone())
            .width(Length::Fill)
            .height(Length::Fixed(320.0))
            .into(),
        None => placeholder("Upload a reference image to start"),
    };

    let generated_panel: Element<'a, Message> = if generating {
        placeholder("Rendering new view...")
    } else {
        match generated {
            // Click to enlarge
            Some(handle) => mouse_area(
                Image::new(handle.clone())
                    .width(Length::Fill)
                    .height(Length::Fixed(320.0)),
            )
            .on_press(Message::TogglePreview)
            .into(),
            None => placeholder("The generated view appears here"),
        }
    };

    let has_result = generated.is_some() && !generating;
    let result_actions = row![
        button(text("Enlarge").size(12))
            .on_press_maybe(has_result.then_some(Message::TogglePreview))
            .style(button::secondary),
        button(text("Save image").size(12))
            .on_press_maybe(has_result.then_some(Message::SaveGenerated))
            .style(button::secondary),
    ]
    .spacing(6);

    let upload_label = if uploading { "Loading..." } else { "Upload Image" };
    let upload = button(text(upload_label))
        .on_press_maybe((!generating && !uploading).then_some(Message::PickImage))
        .padding(8);

    column![
        row![
            column![text("ORIGINAL").size(12), original_panel]
                .spacing(6)
                .width(Length::FillPortion(1)),
            column![text("NEW VIEW").size(12), generated_panel, result_actions]
                .spacing(6)
                .width(Length::FillPortion(1)),
        ]
        .spacing(PANEL_SPACING),
        upload,
    ]
    .spacing(PANEL_SPACING)
    .into()
}

fn placeholder<'a>(label: &'a str) -> Element<'a, Message> {
    container(text(label).size(14))
        .width(Length::Fill)
        .height(Length::Fixed(320.0))
        .center_x(Length::Fill)
        .center_y(Length::Fixed(320.0))
        .style(container::bordered_box)
        .into()
}

/// The generated image at full window size
pub fn enlarged_preview(handle: &Handle) -> Element<'_, Message> {
    let image = mouse_area(
        Image::new(handle.clone())
            .content_fit(ContentFit::Contain)
            .width(Length::Fill)
            .height(Length::Fill),
    )
    .on_press(Message::TogglePreview);

    column![
        row![
            horizontal_space(),
            button(text("Save image").size(13))
                .on_press(Message::SaveGenerated)
                .style(button::secondary),
            button(text("Close").size(13)).on_press(Message::TogglePreview),
        ]
        .spacing(8),
        container(image)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill),
    ]
    .spacing(12)
    .padding(24)
    .into()
}

/// One tab per pose, with remove buttons while more than one exists
pub fn pose_tabs(poses: &PoseStore) -> Element<'_, Message> {
    let removable = poses.len() > 1;

    let mut tabs = Row::new().spacing(6).align_y(Alignment::Center);
    for pose in poses.poses() {
        let is_active = pose.id == poses.active_id();
        let tab = button(text(&pose.name).size(13))
            .on_press(Message::SelectPose(pose.id.clone()))
            .style(if is_active {
                button::primary
            } else {
                button::secondary
            });
        tabs = tabs.push(tab);

        if removable {
            tabs = tabs.push(
                button(text("×").size(13))
                    .on_press(Message::RemovePose(pose.id.clone()))
                    .style(button::text),
            );
        }
    }

    tabs.push(button(text("+").size(13)).on_press(Message::AddPose))
        .into()
}

/// Drag-to-orbit schematic for the active pose
pub fn orbit_panel(poses: &PoseStore, disabled: bool) -> Element<'_, Message> {
    canvas(OrbitControl {
        poses: poses.poses(),
        active_id: poses.active_id(),
        disabled,
    })
    .width(Length::Fill)
    .height(Length::Fixed(200.0))
    .into()
}

/// Built-in shot presets
pub fn preset_grid<'a>() -> Element<'a, Message> {
    let buttons: Vec<Element<'a, Message>> = PRESETS
        .iter()
        .map(|preset| {
            button(text(preset.name).size(12))
                .on_press(Message::ApplyPreset(preset))
                .style(button::secondary)
                .into()
        })
        .collect();

    column![
        text("PRESETS").size(12),
        Wrap::with_elements(buttons)
            .spacing(Pixels(6.0))
            .line_spacing(Pixels(6.0)),
    ]
    .spacing(6)
    .into()
}

fn labelled<'a>(label: &'a str, value: String, control: Element<'a, Message>) -> Element<'a, Message> {
    column![
        row![text(label).size(12), horizontal_space(), text(value).size(12)],
        control,
    ]
    .spacing(4)
    .into()
}

/// Orbit and lens sliders for the active pose
pub fn sliders(settings: &CameraSettings) -> Element<'_, Message> {
    Column::new()
        .spacing(10)
        .push(labelled(
            "AZIMUTH",
            format!("{}°", settings.azimuth),
            slider(AZIMUTH_RANGE.0..=AZIMUTH_RANGE.1, settings.azimuth, Message::AzimuthChanged).into(),
        ))
        .push(labelled(
            "ELEVATION",
            format!("{}°", settings.elevation),
            slider(
                ELEVATION_RANGE.0..=ELEVATION_RANGE.1,
                settings.elevation,
                Message::ElevationChanged,
            ).into(),
        ))
        .push(labelled(
            "ZOOM",
            format!("{:.2}x", settings.zoom),
            slider(ZOOM_RANGE.0..=ZOOM_RANGE.1, settings.zoom, Message::ZoomChanged)
                .step(0.05)
                .into(),
        ))
        .push(labelled(
            "FIELD OF VIEW",
            format!("{}°", settings.fov),
            slider(FOV_RANGE.0..=FOV_RANGE.1, settings.fov, Message::FovChanged).into(),
        ))
        .into()
}

/// Free-text scene description for the active pose
pub fn description_input(settings: &CameraSettings) -> Element<'_, Message> {
    column![
        text("SCENE DESCRIPTION").size(12),
        text_input(
            "e.g. minimalist style, cinematic lighting...",
            settings.description.as_deref().unwrap_or_default(),
        )
        .on_input(Message::DescriptionChanged)
        .padding(8),
    ]
    .spacing(6)
    .into()
}

/// Resolution and aspect ratio pickers
pub fn output_settings(settings: &CameraSettings) -> Element<'_, Message> {
    let sizes = ImageSize::ALL.iter().fold(Row::new().spacing(6), |row, size| {
        row.push(
            button(text(size.as_str()).size(12))
                .on_press(Message::ImageSizeSelected(*size))
                .style(if *size == settings.image_size {
                    button::primary
                } else {
                    button::secondary
                }),
        )
    });

    let ratios = AspectRatio::ALL.iter().fold(Row::new().spacing(6), |row, ratio| {
        row.push(
            button(text(ratio.as_str()).size(12))
                .on_press(Message::AspectRatioSelected(*ratio))
                .style(if *ratio == settings.aspect_ratio {
                    button::primary
                } else {
                    button::secondary
                }),
        )
    });

    column![
        text("RESOLUTION").size(12),
        sizes,
        text("ASPECT RATIO").size(12),
        ratios,
    ]
    .spacing(6)
    .into()
}

/// Key prompt shown while no usable API key is selected
pub fn credential_prompt<'a>(api_key_input: &'a str, error: Option<&'a str>) -> Element<'a, Message> {
    let mut content = column![
        text("Enable the Pro rendering engine").size(24),
        text(
            "Rendering uses a paid image model. Paste an API key from a \
             billing-enabled project to continue."
        )
        .size(14),
        text_input("API key", api_key_input)
            .on_input(Message::ApiKeyChanged)
            .on_submit(Message::SubmitApiKey)
            .secure(true)
            .padding(10),
        button(text("Use this key"))
            .on_press_maybe((!api_key_input.trim().is_empty()).then_some(Message::SubmitApiKey))
            .padding(10)
            .width(Length::Fill),
    ]
    .spacing(16)
    .max_width(420)
    .align_x(Alignment::Center);

    if let Some(error) = error {
        content = content.push(text(error).size(13).style(text::danger));
    }

    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into()
}
