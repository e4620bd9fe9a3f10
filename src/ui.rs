use bevy::prelude::*;
use bevy::render::render_asset::RenderAssetUsages;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use bevy::ui::BackgroundColor;
use image::RgbImage;

use vistaforge::photo::CameraMode;
use vistaforge::plugin::{Painting, PhotoState, VistaWorld};

/// Top-left corner of the paint canvas on screen, in logical pixels.
pub const CANVAS_OFFSET: Vec2 = Vec2::new(40.0, 40.0);
const THUMBNAIL_WIDTH: f32 = 160.0;

#[derive(Component)]
pub struct PauseOverlay;

#[derive(Component)]
pub struct FadeOverlay;

#[derive(Component)]
pub struct HudText;

#[derive(Component)]
pub struct PaintCanvasView;

#[derive(Component)]
pub struct HeldPhotoView;

/// Upload an RGB raster as a UI-ready sRGB texture.
pub fn rgb_to_image(raster: &RgbImage) -> Image {
    let (width, height) = raster.dimensions();
    let data = raster.pixels().flat_map(|p| [p[0], p[1], p[2], 255]).collect();
    Image::new(
        Extent3d { width, height, depth_or_array_layers: 1 },
        TextureDimension::D2,
        data,
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::default(),
    )
}

pub fn spawn_pause_overlay(mut commands: Commands) {
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            BackgroundColor(Color::linear_rgba(0.0, 0.0, 0.0, 0.7)),
            GlobalZIndex(10),
            PauseOverlay,
        ))
        .with_children(|parent| {
            parent.spawn((
                Text::new("Paused"),
                TextFont { font_size: 64.0, ..default() },
                TextLayout::new_with_justify(JustifyText::Center),
                TextColor(Color::WHITE),
            ));
        });
}

pub fn despawn_pause_overlay(mut commands: Commands, query: Query<Entity, With<PauseOverlay>>) {
    for entity in &query {
        commands.entity(entity).despawn();
    }
}

/// Startup: HUD line, photo fade, and the (hidden) held-photo thumbnail.
pub fn spawn_hud(mut commands: Commands) {
    commands.spawn((
        Node {
            position_type: PositionType::Absolute,
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        },
        BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.0)),
        GlobalZIndex(5),
        FadeOverlay,
    ));
    commands.spawn((
        Text::new(""),
        TextFont { font_size: 18.0, ..default() },
        TextColor(Color::WHITE),
        Node { position_type: PositionType::Absolute, left: Val::Px(12.0), bottom: Val::Px(12.0), ..default() },
        HudText,
    ));
    commands.spawn((
        ImageNode::default(),
        Node {
            position_type: PositionType::Absolute,
            right: Val::Px(16.0),
            bottom: Val::Px(16.0),
            width: Val::Px(THUMBNAIL_WIDTH),
            ..default()
        },
        Visibility::Hidden,
        HeldPhotoView,
    ));
}

pub fn update_fade_overlay(photo: Res<PhotoState>, mut query: Query<&mut BackgroundColor, With<FadeOverlay>>) {
    if !photo.is_changed() {
        return;
    }
    let alpha = photo.0.sequence().map_or(0.0, |s| s.overlay_alpha());
    for mut bg in &mut query {
        bg.0 = Color::srgba(0.0, 0.0, 0.0, alpha);
    }
}

pub fn update_hud(
    world: Res<VistaWorld>,
    photo: Res<PhotoState>,
    painting: Res<Painting>,
    mut query: Query<&mut Text, With<HudText>>,
) {
    let Ok(mut text) = query.single_mut() else { return };
    let Some(level) = world.level.as_ref() else {
        text.0 = "Loading blueprints...".to_string();
        return;
    };

    let mut line = format!(
        "{} #{}  |  photos placed {}",
        level.blueprint.name,
        world.generator.entry_count(),
        level.progress.total_placements
    );
    if let Some(session) = painting.0.as_ref() {
        let c = &session.canvas;
        let category = c.category();
        line.push_str(&format!(
            "  |  painting {:?}: {} left, saturation {:.1}{}",
            category,
            c.budgets().remaining(category),
            c.saturation(),
            if c.is_edit_mode() { " [edit]" } else { "" },
        ));
    } else {
        match photo.0.mode() {
            CameraMode::Idle => {}
            CameraMode::Aiming => line.push_str(&format!(
                "  |  aiming fov {:.0}, reach {:.0}",
                photo.0.fov(),
                photo.0.frustum_height()
            )),
            CameraMode::Placing => {
                line.push_str(&format!("  |  placing at {:.0}", photo.0.placement_distance()))
            }
        }
    }
    if text.0 != line {
        text.0 = line;
    }
}

pub fn spawn_paint_canvas(mut commands: Commands, painting: Res<Painting>, mut images: ResMut<Assets<Image>>) {
    let Some(session) = painting.0.as_ref() else { return };
    let raster = session.canvas.raster();
    let (w, h) = raster.dimensions();
    commands.spawn((
        ImageNode::new(images.add(rgb_to_image(raster))),
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(CANVAS_OFFSET.x),
            top: Val::Px(CANVAS_OFFSET.y),
            width: Val::Px(w as f32),
            height: Val::Px(h as f32),
            ..default()
        },
        PaintCanvasView,
    ));
}

pub fn despawn_paint_canvas(mut commands: Commands, query: Query<Entity, With<PaintCanvasView>>) {
    for entity in &query {
        commands.entity(entity).despawn();
    }
}

/// Re-upload the raster whenever the session changes.
pub fn update_paint_canvas(
    painting: Res<Painting>,
    mut images: ResMut<Assets<Image>>,
    query: Query<&ImageNode, With<PaintCanvasView>>,
) {
    if !painting.is_changed() {
        return;
    }
    let Some(session) = painting.0.as_ref() else { return };
    for node in &query {
        if let Some(image) = images.get_mut(&node.image) {
            *image = rgb_to_image(session.canvas.raster());
        }
    }
}

pub fn update_held_photo(
    photo: Res<PhotoState>,
    mut images: ResMut<Assets<Image>>,
    mut shown: Local<bool>,
    mut query: Query<(&mut ImageNode, &mut Node, &mut Visibility), With<HeldPhotoView>>,
) {
    if !photo.is_changed() {
        return;
    }
    let Ok((mut view, mut node, mut vis)) = query.single_mut() else { return };
    let Some(held) = photo.0.held() else {
        *shown = false;
        vis.set_if_neq(Visibility::Hidden);
        return;
    };

    if !*shown {
        view.image = images.add(rgb_to_image(&held.image));
        *shown = true;
    }
    let scale = if photo.0.mode() == CameraMode::Placing { photo.0.placement_ui_scale() } else { 1.0 };
    node.width = Val::Px(THUMBNAIL_WIDTH * scale);
    vis.set_if_neq(Visibility::Inherited);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_upload_is_opaque_rgba() {
        let raster = RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]));
        let img = rgb_to_image(&raster);
        assert_eq!(img.width(), 3);
        assert_eq!(img.height(), 2);
        let data = img.data.as_ref().unwrap();
        assert_eq!(data.len(), 3 * 2 * 4);
        assert_eq!(&data[..4], &[10, 20, 30, 255]);
    }
}
