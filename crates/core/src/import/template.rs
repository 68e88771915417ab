//! Header-only CSV templates.

use super::target::{ImportTarget, TargetKind};

pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// A downloadable template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Template for a target: its required columns in canonical order.
pub fn template_for(target: &ImportTarget) -> Result<TemplateFile, csv::Error> {
    header_only(
        format!("{}_template.csv", target.kind),
        target.required_columns.iter().copied(),
    )
}

/// Template for the bulk user importer: the full user schema.
pub fn user_import_template() -> Result<TemplateFile, csv::Error> {
    header_only(
        "user_import_template.csv".to_string(),
        TargetKind::Users.target().all_columns(),
    )
}

fn header_only<'a>(
    file_name: String,
    columns: impl IntoIterator<Item = &'a str>,
) -> Result<TemplateFile, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(columns)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(TemplateFile {
        file_name,
        content_type: CSV_CONTENT_TYPE,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::file::{parse, UploadedFile};
    use crate::import::validator::validate;

    #[test]
    fn template_lists_required_columns_in_order() {
        let template = template_for(TargetKind::Plants.target()).unwrap();
        assert_eq!(template.file_name, "plants_template.csv");
        assert_eq!(template.content_type, "text/csv");
        assert_eq!(
            String::from_utf8(template.bytes).unwrap(),
            "name,latin_name,supplier_id,price\n"
        );
    }

    #[test]
    fn user_template_has_full_schema() {
        let template = user_import_template().unwrap();
        assert_eq!(
            String::from_utf8(template.bytes).unwrap(),
            "username,email,password,first_name,last_name,role\n"
        );
    }

    #[test]
    fn every_template_has_no_missing_columns() {
        for kind in TargetKind::ALL {
            let template = template_for(kind.target()).unwrap();
            let file = UploadedFile::new(template.file_name, None, template.bytes);
            let sheet = parse(&file).unwrap();
            assert!(sheet.rows.is_empty());

            let report = validate(&file, kind.target());
            assert!(report.missing_columns.is_empty(), "{kind}");
        }
    }
}
