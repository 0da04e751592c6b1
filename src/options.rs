use ebml_decoder_schema::SchemaEntry;

///
/// Configuration of a [`Decoder`][`super::Decoder`].
///
/// ## Example
///
/// ```
/// use ebml_decoder::DecoderOptions;
/// use ebml_decoder::schema::SchemaEntry;
///
/// let options = DecoderOptions::new()
///     .schema(vec![SchemaEntry::path(0x18538067u64, "Segment", "master", r"1*1(\Segment)")])
///     .strict(false);
/// assert!(options.header);
/// ```
///
#[derive(Clone, Debug)]
pub struct DecoderOptions {
    ///
    /// Elements recognised by the decoder.
    ///
    pub schema: Vec<SchemaEntry>,

    ///
    /// Whether the EBML header elements are merged into `schema`.  Defaults to `true`.
    ///
    pub header: bool,

    ///
    /// Whether unknown ids and children overrunning their parents are fatal.  Defaults to `true`; when `false` they are reported as warnings.
    ///
    pub strict: bool,

    ///
    /// Initial maximum id width in bytes.  When `None` the decoder starts at 4 and follows any `EBMLMaxIDLength` in the stream.
    ///
    pub max_id_length: Option<usize>,

    ///
    /// Initial maximum size width in bytes.  When `None` the decoder starts at 8 and follows any `EBMLMaxSizeLength` in the stream.
    ///
    pub max_size_length: Option<usize>,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        DecoderOptions {
            schema: Vec::new(),
            header: true,
            strict: true,
            max_id_length: None,
            max_size_length: None,
        }
    }
}

impl DecoderOptions {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn schema(mut self, schema: impl IntoIterator<Item = SchemaEntry>) -> Self {
        self.schema = schema.into_iter().collect();
        self
    }

    pub fn header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn max_id_length(mut self, length: usize) -> Self {
        self.max_id_length = Some(length);
        self
    }

    pub fn max_size_length(mut self, length: usize) -> Self {
        self.max_size_length = Some(length);
        self
    }
}
