pub mod dashboard_report;

use rust_xlsxwriter::{Format, FormatBorder};

/// Blue #2C5F8A header with bold white text and a thin border
pub fn create_header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color("2C5F8A")
        .set_font_color("FFFFFF")
        .set_font_size(11)
        .set_border(FormatBorder::Thin)
        .set_text_wrap()
}

/// Titre de section
pub fn create_title_format() -> Format {
    Format::new().set_bold().set_font_size(13)
}

/// Decimal number format #,##0.00
pub fn create_number_format() -> Format {
    Format::new().set_num_format("#,##0.00")
}

/// Format entier #,##0
pub fn create_integer_format() -> Format {
    Format::new().set_num_format("#,##0")
}

/// Grey text for panels without data
pub fn create_muted_format() -> Format {
    Format::new().set_italic().set_font_color("808080")
}
