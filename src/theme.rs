use bevy::prelude::*;
use bevy_egui::egui;
use catppuccin::FlavorName;

/// Convert a catppuccin color to a bevy Color via its RGB values.
fn cat_to_bevy(c: &catppuccin::Color) -> Color {
    Color::srgb(
        c.rgb.r as f32 / 255.0,
        c.rgb.g as f32 / 255.0,
        c.rgb.b as f32 / 255.0,
    )
}

/// Palette for markers, the measurement line, and the HUD.
#[derive(Resource)]
pub struct AppTheme {
    active_flavor: FlavorName,
}

impl Default for AppTheme {
    fn default() -> Self {
        Self {
            active_flavor: FlavorName::Mocha,
        }
    }
}

impl AppTheme {
    fn colors(&self) -> &catppuccin::FlavorColors {
        &catppuccin::PALETTE.get_flavor(self.active_flavor).colors
    }

    pub fn start_marker(&self) -> Color { cat_to_bevy(&self.colors().red) }
    pub fn end_marker(&self) -> Color { cat_to_bevy(&self.colors().blue) }
    pub fn segment(&self) -> Color { cat_to_bevy(&self.colors().yellow) }

    pub fn hud_text(&self) -> Color { cat_to_bevy(&self.colors().text) }
    pub fn hud_subtext(&self) -> Color { cat_to_bevy(&self.colors().subtext0) }
    pub fn hud_background(&self) -> Color { cat_to_bevy(&self.colors().crust) }
    pub fn hud_accent(&self) -> Color { cat_to_bevy(&self.colors().yellow) }
}

/// Convert a `bevy::color::Color` to `egui::Color32`.
pub fn to_egui_color32(color: Color) -> egui::Color32 {
    to_egui_color32_alpha(color, (color.to_srgba().alpha * 255.0) as u8)
}

/// Convert a `bevy::color::Color` to `egui::Color32` with a custom alpha.
pub fn to_egui_color32_alpha(color: Color, alpha: u8) -> egui::Color32 {
    let srgba = color.to_srgba();
    egui::Color32::from_rgba_unmultiplied(
        (srgba.red * 255.0) as u8,
        (srgba.green * 255.0) as u8,
        (srgba.blue * 255.0) as u8,
        alpha,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_are_distinguishable() {
        let theme = AppTheme::default();
        assert_ne!(theme.start_marker(), theme.end_marker());
    }

    #[test]
    fn egui_conversion_keeps_channels() {
        let c = to_egui_color32(Color::srgb(1.0, 0.0, 1.0));
        assert_eq!(c, egui::Color32::from_rgba_unmultiplied(255, 0, 255, 255));
    }
}
