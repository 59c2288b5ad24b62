use tantivy::schema::{Field, STORED, STRING, Schema, TextOptions};

pub const FIELD_ID: &str = "id";
pub const FIELD_CANONICAL: &str = "canonical";
pub const FIELD_USAGE: &str = "usage";

/// Field handles for the taxon schema.
///
/// `id` and `canonical` are raw untokenized terms; normalization happens in
/// [`crate::normalize`] before anything touches the index. The full usage is
/// stored once as a JSON payload so hits deserialize straight into a
/// [`backbone_types::TaxonUsage`].
#[derive(Clone, Copy, Debug)]
pub struct TaxonFields {
    pub id: Field,
    pub canonical: Field,
    pub usage: Field,
}

pub fn build_schema() -> (Schema, TaxonFields) {
    let mut builder = Schema::builder();
    let id = builder.add_text_field(FIELD_ID, STRING | STORED);
    let canonical = builder.add_text_field(FIELD_CANONICAL, STRING);
    let usage = builder.add_text_field(FIELD_USAGE, TextOptions::default().set_stored());
    let schema = builder.build();
    (
        schema,
        TaxonFields {
            id,
            canonical,
            usage,
        },
    )
}

pub fn fields_of(schema: &Schema) -> Result<TaxonFields, tantivy::TantivyError> {
    Ok(TaxonFields {
        id: schema.get_field(FIELD_ID)?,
        canonical: schema.get_field(FIELD_CANONICAL)?,
        usage: schema.get_field(FIELD_USAGE)?,
    })
}
