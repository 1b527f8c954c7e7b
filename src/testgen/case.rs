use serde::{Deserialize, Serialize};

/// Column headers used by every tabular consumer (CSV export, listings).
pub const COLUMNS: [&str; 8] = [
    "Test Case ID",
    "Test Title",
    "Description",
    "Preconditions",
    "Test Steps",
    "Test Data",
    "Expected Result",
    "Comments",
];

/// A single generated test case.
///
/// Created only by the normalizer or the fallback synthesizer. `test_steps`
/// is always a flattened `"N. step"` string, never a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub test_case_id: u32,
    pub test_title: String,
    pub description: String,
    pub preconditions: String,
    pub test_steps: String,
    pub test_data: String,
    pub expected_result: String,
    pub comments: String,
}

impl TestCase {
    /// Plain ordered mapping of the record, one entry per column.
    ///
    /// CSV export and the CLI listing read records through this.
    pub fn to_row(&self) -> [(&'static str, String); 8] {
        [
            (COLUMNS[0], self.test_case_id.to_string()),
            (COLUMNS[1], self.test_title.clone()),
            (COLUMNS[2], self.description.clone()),
            (COLUMNS[3], self.preconditions.clone()),
            (COLUMNS[4], self.test_steps.clone()),
            (COLUMNS[5], self.test_data.clone()),
            (COLUMNS[6], self.expected_result.clone()),
            (COLUMNS[7], self.comments.clone()),
        ]
    }

    /// Individual steps with their numbering stripped.
    pub fn steps(&self) -> Vec<&str> {
        self.test_steps
            .lines()
            .map(|line| match line.split_once(". ") {
                Some((n, rest)) if n.chars().all(|c| c.is_ascii_digit()) => rest,
                _ => line,
            })
            .filter(|s| !s.trim().is_empty())
            .collect()
    }

    /// Mutable handles to every free-text field except `test_data`.
    pub(crate) fn prose_fields_mut(&mut self) -> [&mut String; 6] {
        [
            &mut self.test_title,
            &mut self.description,
            &mut self.preconditions,
            &mut self.test_steps,
            &mut self.expected_result,
            &mut self.comments,
        ]
    }
}

/// Reassign ids `1..=n` in list order.
pub fn renumber(cases: &mut [TestCase]) {
    for (i, case) in cases.iter_mut().enumerate() {
        case.test_case_id = i as u32 + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TestCase {
        TestCase {
            test_case_id: 7,
            test_title: "Email Field".into(),
            description: "Valid login".into(),
            preconditions: "User is registered".into(),
            test_steps: "1. Open login page\n2. Enter email\n3. Click Login".into(),
            test_data: "Email: an@example.com".into(),
            expected_result: "Dashboard is shown".into(),
            comments: String::new(),
        }
    }

    #[test]
    fn row_follows_column_order() {
        let row = sample().to_row();
        assert_eq!(row[0], ("Test Case ID", "7".to_string()));
        assert_eq!(row[1].1, "Email Field");
        assert_eq!(row[7].0, "Comments");
    }

    #[test]
    fn steps_drop_numbering() {
        let case = sample();
        assert_eq!(
            case.steps(),
            vec!["Open login page", "Enter email", "Click Login"]
        );
    }

    #[test]
    fn renumber_is_sequential_from_one() {
        let mut cases = vec![sample(), sample(), sample()];
        renumber(&mut cases);
        let ids: Vec<u32> = cases.iter().map(|c| c.test_case_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
