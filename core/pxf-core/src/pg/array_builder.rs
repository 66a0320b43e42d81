use super::escape_array_element;

/// Incrementally renders a one-dimensional array literal such as `{1,"a b",NULL}`.
#[derive(Debug, Default)]
pub struct PgArrayBuilder {
    buffer: String,
    first: bool,
}

impl PgArrayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_array(&mut self) {
        self.buffer.clear();
        self.buffer.push('{');
        self.first = true;
    }

    pub fn end_array(&mut self) {
        self.buffer.push('}');
    }

    /// Append an element, escaping and quoting it as needed.
    pub fn add_element(&mut self, value: Option<&str>) {
        self.separate();
        self.buffer.push_str(&escape_array_element(value));
    }

    /// Append text that is already in array-element form.
    pub fn add_element_no_escaping(&mut self, value: &str) {
        self.separate();
        self.buffer.push_str(value);
    }

    /// Append an element produced by `write`, which receives the output buffer.
    pub fn add_element_with(&mut self, write: impl FnOnce(&mut String)) {
        self.separate();
        write(&mut self.buffer);
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    pub fn into_string(self) -> String {
        self.buffer
    }

    fn separate(&mut self) {
        if !self.first {
            self.buffer.push(',');
        }
        self.first = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(f: impl FnOnce(&mut PgArrayBuilder)) -> String {
        let mut builder = PgArrayBuilder::new();
        builder.start_array();
        f(&mut builder);
        builder.end_array();
        builder.into_string()
    }

    #[test]
    fn empty_array() {
        assert_eq!(build(|_| {}), "{}");
    }

    #[test]
    fn elements_without_escaping() {
        assert_eq!(
            build(|b| {
                b.add_element_no_escaping("test");
                b.add_element_no_escaping("elem2");
            }),
            "{test,elem2}"
        );
        assert_eq!(build(|b| b.add_element_no_escaping("")), "{}");
        assert_eq!(
            build(|b| {
                b.add_element_no_escaping("");
                b.add_element_no_escaping("");
            }),
            "{,}"
        );
    }

    #[test]
    fn elements_needing_escaping() {
        assert_eq!(
            build(|b| {
                b.add_element(Some("test element"));
                b.add_element(Some("\"escape me\" she said"));
            }),
            r#"{"test element","\"escape me\" she said"}"#
        );
        assert_eq!(build(|b| b.add_element(None)), "{NULL}");
        assert_eq!(
            build(|b| {
                b.add_element(Some(""));
                b.add_element(Some(""));
            }),
            r#"{"",""}"#
        );
    }

    #[test]
    fn element_writer_closure() {
        assert_eq!(
            build(|b| {
                b.add_element_with(|buf| buf.push('1'));
                b.add_element_with(|buf| buf.push('2'));
            }),
            "{1,2}"
        );
    }

    #[test]
    fn restart_clears_previous_array() {
        let mut builder = PgArrayBuilder::new();
        builder.start_array();
        builder.add_element(Some("x"));
        builder.end_array();
        builder.start_array();
        builder.end_array();
        assert_eq!(builder.as_str(), "{}");
    }
}
