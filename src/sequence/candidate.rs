/// One extracted reference to a possible content asset
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    /// Absolute asset URL
    pub url: String,

    /// Storage-assigned numeric ID embedded in the URL (e.g. a media ID).
    /// Candidates without one cannot be placed in a sequence.
    pub numeric_id: Option<u64>,

    /// Page number taken from a purely numeric file name
    pub page_number: Option<u32>,
}

impl Candidate {
    pub fn new(url: impl Into<String>, numeric_id: u64) -> Self {
        Self {
            url: url.into(),
            numeric_id: Some(numeric_id),
            page_number: None,
        }
    }

    /// A candidate whose URL carried no usable numeric ID
    pub fn without_id(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            numeric_id: None,
            page_number: None,
        }
    }

    pub fn with_page_number(mut self, page_number: u32) -> Self {
        self.page_number = Some(page_number);
        self
    }
}
