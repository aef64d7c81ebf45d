use chrono::NaiveDateTime;
use serde::Serialize;

/// Logical columns the dashboard reads. Everything else is passthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Field {
    Services,
    Tags,
    Company,
    CreatedDate,
    FinishDate,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Services,
        Field::Tags,
        Field::Company,
        Field::CreatedDate,
        Field::FinishDate,
    ];

    /// Header name in the spreadsheet export.
    pub fn column(self) -> &'static str {
        match self {
            Field::Services => "Services",
            Field::Tags => "Tags",
            Field::Company => "Company",
            Field::CreatedDate => "Created Date",
            Field::FinishDate => "Finish Date",
        }
    }

    pub fn from_column(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.column() == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TicketRaw {
    pub services: Option<String>,
    pub tags: Option<String>,
    pub company: Option<String>,
    pub created_date: Option<String>,
    pub finish_date: Option<String>,
}

/// One row of the dataset after normalisation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub service: Option<String>,
    pub tags: Option<String>,
    pub company: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub finish_at: Option<NaiveDateTime>,
    /// Unused columns, kept in header order for the detail table.
    pub extra: Vec<(String, String)>,
}

impl Ticket {
    /// Text value of a label field. Date fields have no label.
    pub fn label(&self, field: Field) -> Option<&str> {
        match field {
            Field::Services => self.service.as_deref(),
            Field::Tags => self.tags.as_deref(),
            Field::Company => self.company.as_deref(),
            Field::CreatedDate | Field::FinishDate => None,
        }
    }
}

/// Immutable table handed to the render pass.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub tickets: Vec<Ticket>,
    /// Logical columns present in the source header.
    pub fields: Vec<Field>,
    /// Passthrough column names, in header order.
    pub extra_columns: Vec<String>,
}

impl Dataset {
    pub fn has(&self, field: Field) -> bool {
        self.fields.contains(&field)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseWarning {
    pub line: usize,
    pub message: String,
}
