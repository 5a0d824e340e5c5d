use tracing::debug;

/// Distance from the phone line back to the department line on a technology
/// page: `[.., department, <one line>, "Fone: .."]`.
pub const DEPARTMENT_OFFSET: usize = 2;

/// Position assumptions the scanner relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub department_offset: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            department_offset: DEPARTMENT_OFFSET,
        }
    }
}

/// Keyword markers, tested against the lower-cased start of a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Benefits,
    Status,
    Trl,
    Inventors,
    Phone,
    Email,
}

impl Anchor {
    pub const ALL: [Anchor; 6] = [
        Anchor::Benefits,
        Anchor::Status,
        Anchor::Trl,
        Anchor::Inventors,
        Anchor::Phone,
        Anchor::Email,
    ];

    pub fn prefix(self) -> &'static str {
        match self {
            Anchor::Benefits => "benefícios",
            Anchor::Status => "status",
            Anchor::Trl => "tecnológica",
            Anchor::Inventors => "pessoas inventoras",
            Anchor::Phone => "fone",
            Anchor::Email => "e-mail",
        }
    }

    /// First anchor (in canonical order) whose marker starts `fragment`.
    ///
    /// The TRL label is sometimes rendered as one text node, so a fragment
    /// ending in "maturidade tecnológica" counts as the TRL anchor too.
    pub fn detect(fragment: &str) -> Option<Anchor> {
        let lower = fragment.to_lowercase();
        Anchor::ALL
            .into_iter()
            .find(|a| lower.starts_with(a.prefix()))
            .or_else(|| lower.ends_with("maturidade tecnológica").then_some(Anchor::Trl))
    }

    /// Phase the scanner is in once this anchor has been handled.
    fn next_phase(self) -> Phase {
        match self {
            Anchor::Benefits => Phase::SeekingStatus,
            Anchor::Status => Phase::SeekingTrl,
            Anchor::Trl => Phase::SeekingInventors,
            Anchor::Inventors => Phase::SeekingPhone,
            Anchor::Phone => Phase::SeekingEmail,
            Anchor::Email => Phase::Done,
        }
    }

    /// Phase in which this anchor is expected on a well-formed page.
    fn expected_in(self) -> Phase {
        match self {
            Anchor::Benefits => Phase::SeekingBenefits,
            Anchor::Status => Phase::SeekingStatus,
            Anchor::Trl => Phase::SeekingTrl,
            Anchor::Inventors => Phase::SeekingInventors,
            Anchor::Phone => Phase::SeekingPhone,
            Anchor::Email => Phase::SeekingEmail,
        }
    }
}

/// Scanner progress. Only moves forward; an anchor seen out of order still
/// writes its field (last write wins) but never moves the phase back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    SeekingBenefits,
    SeekingStatus,
    SeekingTrl,
    SeekingInventors,
    SeekingPhone,
    SeekingEmail,
    Done,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub benefits: Vec<String>,
    pub status: Option<String>,
    pub trl: Option<String>,
    pub description: Vec<String>,
    pub inventors: Vec<String>,
    pub department: Option<String>,
    pub contacts: Vec<String>,
}

/// Mutable accumulator for one scan. Each slot starts at its "anchor not
/// found" value and is committed into `ExtractedFields` by `finish`.
#[derive(Debug, Default)]
pub struct FieldsBuilder {
    benefits: Vec<String>,
    status: Option<String>,
    trl: Option<String>,
    description: Vec<String>,
    inventors: Vec<String>,
    department: Option<String>,
    contacts: Vec<String>,
    seen: Vec<Anchor>,
}

impl FieldsBuilder {
    fn mark(&mut self, anchor: Anchor) {
        if !self.seen.contains(&anchor) {
            self.seen.push(anchor);
        }
    }

    pub fn missing_anchors(&self) -> Vec<Anchor> {
        Anchor::ALL
            .into_iter()
            .filter(|a| !self.seen.contains(a))
            .collect()
    }

    pub fn finish(self) -> ExtractedFields {
        ExtractedFields {
            benefits: self.benefits,
            status: self.status,
            trl: self.trl,
            description: self.description,
            inventors: self.inventors,
            department: self.department,
            contacts: self.contacts,
        }
    }
}

/// Single forward pass over the fragments of one page.
pub struct Scanner<'a> {
    fragments: &'a [String],
    layout: Layout,
    phase: Phase,
    trl_index: Option<usize>,
    inventors_start: Option<usize>,
    fields: FieldsBuilder,
}

impl<'a> Scanner<'a> {
    pub fn new(fragments: &'a [String], layout: Layout) -> Self {
        Scanner {
            fragments,
            layout,
            phase: Phase::SeekingBenefits,
            trl_index: None,
            inventors_start: None,
            fields: FieldsBuilder::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn run(&mut self) {
        let mut i = 0;
        while i < self.fragments.len() {
            let Some(anchor) = Anchor::detect(&self.fragments[i]) else {
                i += 1;
                continue;
            };
            if anchor.expected_in() < self.phase {
                debug!(?anchor, phase = ?self.phase, index = i, "anchor out of canonical order");
            }
            self.fields.mark(anchor);
            i = match anchor {
                Anchor::Benefits => self.benefits(i),
                Anchor::Status => self.status(i),
                Anchor::Trl => self.trl(i),
                Anchor::Inventors => self.description(i),
                Anchor::Phone => self.phone(i),
                Anchor::Email => self.email(i),
            };
            self.phase = self.phase.max(anchor.next_phase());
        }
    }

    pub fn into_fields(self) -> FieldsBuilder {
        self.fields
    }

    /// Everything after the anchor up to the next "status" line, or to the
    /// end of the page when there is none. The status line is left for the
    /// main loop.
    fn benefits(&mut self, at: usize) -> usize {
        let end = self.fragments[at + 1..]
            .iter()
            .position(|f| f.to_lowercase().starts_with(Anchor::Status.prefix()))
            .map_or(self.fragments.len(), |p| at + 1 + p);
        self.fields.benefits = self.fragments[at + 1..end]
            .iter()
            .map(|f| f.trim().replace('\n', " "))
            .collect();
        end
    }

    /// "Status Vigente." → "Vigente".
    fn status(&mut self, at: usize) -> usize {
        let value = self.fragments[at]
            .split_whitespace()
            .nth(1)
            .map(|t| t.trim_end_matches('.').trim())
            .filter(|t| !t.is_empty());
        if let Some(v) = value {
            self.fields.status = Some(v.to_string());
        }
        at + 1
    }

    fn trl(&mut self, at: usize) -> usize {
        self.trl_index = Some(at);
        if let Some(value) = self.fragments.get(at + 1) {
            self.fields.trl = Some(value.trim().to_string());
        }
        at + 1
    }

    /// Lines after the TRL value and before the "pessoas inventoras" marker.
    /// Without a preceding TRL anchor the range is undefined and left empty.
    fn description(&mut self, at: usize) -> usize {
        self.inventors_start = Some(at + 1);
        self.fields.description = match self.trl_index {
            Some(trl) if trl + 2 <= at => self.fragments[trl + 2..at].to_vec(),
            _ => Vec::new(),
        };
        at + 1
    }

    /// Phone, department and inventors all hang off the phone line.
    fn phone(&mut self, at: usize) -> usize {
        if let Some(number) = after_colon(&self.fragments[at]) {
            self.fields.contacts.push(number);
        }
        if let Some(dept) = at.checked_sub(self.layout.department_offset) {
            self.fields.department = Some(self.fragments[dept].trim().to_string());
            self.fields.inventors = match self.inventors_start {
                Some(start) if start <= dept => self.fragments[start..dept].to_vec(),
                _ => Vec::new(),
            };
        }
        at + 1
    }

    fn email(&mut self, at: usize) -> usize {
        if let Some(address) = after_colon(&self.fragments[at]) {
            self.fields.contacts.push(address);
        }
        at + 1
    }
}

fn after_colon(fragment: &str) -> Option<String> {
    fragment
        .split_once(':')
        .map(|(_, rest)| rest.trim())
        .filter(|rest| !rest.is_empty())
        .map(str::to_string)
}

/// Recover the technology fields from a page's flattened text.
pub fn extract(fragments: &[String], layout: Layout) -> ExtractedFields {
    let mut scanner = Scanner::new(fragments, layout);
    scanner.run();
    let phase = scanner.phase();
    let builder = scanner.into_fields();
    let missing = builder.missing_anchors();
    if !missing.is_empty() {
        debug!(?missing, ?phase, "anchors not found");
    }
    builder.finish()
}
