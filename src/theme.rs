use crate::settings::ColorScheme;

/// ANSI SGR parameters for each part of the countdown line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub title: &'static str,
    pub clock: &'static str,
    pub past: &'static str,
    pub detail: &'static str,
}

pub fn palette(scheme: ColorScheme) -> Palette {
    match scheme {
        ColorScheme::Default => Palette {
            title: "1",
            clock: "1;37",
            past: "1;31",
            detail: "2",
        },
        ColorScheme::Midnight => Palette {
            title: "1;35",
            clock: "1;34",
            past: "1;31",
            detail: "34",
        },
        ColorScheme::Ocean => Palette {
            title: "1;36",
            clock: "1;96",
            past: "1;91",
            detail: "36",
        },
        ColorScheme::Forest => Palette {
            title: "1;32",
            clock: "1;92",
            past: "1;33",
            detail: "32",
        },
        ColorScheme::Sunset => Palette {
            title: "1;33",
            clock: "1;93",
            past: "1;35",
            detail: "33",
        },
    }
}

pub fn paint(text: &str, sgr: &str, enabled: bool) -> String {
    if enabled {
        format!("\x1b[{sgr}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}
