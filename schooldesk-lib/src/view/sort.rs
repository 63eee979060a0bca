//! Sort descriptor and the record comparator

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveDateTime;
use chrono::NaiveTime;
use serde::Deserialize;
use serde::Serialize;
use unicase::UniCase;

use crate::model::Record;
use crate::model::Value;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Returns the opposite direction.
    pub fn flip(self) -> Self {
        match self {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        }
    }
}

/// The active sort column and direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDescriptor {
    pub column: String,
    #[serde(default)]
    pub direction: Direction,
}

impl SortDescriptor {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Desc,
        }
    }

    /// Clicking the active column flips the direction; any other column
    /// becomes active in ascending order.
    pub fn toggle(&mut self, column: &str) {
        if self.column == column {
            self.direction = self.direction.flip();
        } else {
            self.column = column.to_string();
            self.direction = Direction::Asc;
        }
    }
}

/// What a field value is compared as.
enum SortKey<'a> {
    Blank,
    Number(f64),
    Moment(NaiveDateTime),
    Text(Cow<'a, str>),
}

impl<'a> SortKey<'a> {
    fn of(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => SortKey::Blank,
            Some(Value::Int(n)) => SortKey::Number(*n as f64),
            Some(Value::Float(n)) => SortKey::Number(*n),
            Some(Value::Date(d)) => SortKey::Moment(d.and_time(NaiveTime::MIN)),
            Some(Value::DateTime(dt)) => SortKey::Moment(dt.naive_utc()),
            Some(Value::String(s)) => SortKey::Text(Cow::Borrowed(s.as_str())),
            Some(other) => SortKey::Text(Cow::Owned(other.to_string())),
        }
    }

    fn mode(&self) -> Option<Mode> {
        match self {
            SortKey::Blank => None,
            SortKey::Number(_) => Some(Mode::Number),
            SortKey::Moment(_) => Some(Mode::Moment),
            SortKey::Text(_) => Some(Mode::Text),
        }
    }

    fn text(&self) -> Cow<'_, str> {
        match self {
            SortKey::Blank => Cow::Borrowed(""),
            SortKey::Number(n) => Cow::Owned(n.to_string()),
            SortKey::Moment(m) => Cow::Owned(m.to_string()),
            SortKey::Text(s) => Cow::Borrowed(s),
        }
    }
}

/// How every key of one sort is compared. A column holding more than one
/// kind of value sorts entirely by text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Number,
    Moment,
    Text,
}

impl Mode {
    fn of<'a>(keys: impl IntoIterator<Item = &'a SortKey<'a>>) -> Self {
        let mut modes = keys.into_iter().filter_map(SortKey::mode);
        let Some(first) = modes.next() else {
            return Mode::Text;
        };
        if modes.all(|mode| mode == first) {
            first
        } else {
            Mode::Text
        }
    }

    fn compare(self, left: &SortKey<'_>, right: &SortKey<'_>) -> Ordering {
        match (self, left, right) {
            (_, SortKey::Blank, SortKey::Blank) => Ordering::Equal,
            (Mode::Number | Mode::Moment, SortKey::Blank, _) => Ordering::Less,
            (Mode::Number | Mode::Moment, _, SortKey::Blank) => Ordering::Greater,
            (Mode::Number, SortKey::Number(x), SortKey::Number(y)) => x.total_cmp(y),
            (Mode::Moment, SortKey::Moment(x), SortKey::Moment(y)) => x.cmp(y),
            _ => collate(&left.text(), &right.text()),
        }
    }
}

fn collate(a: &str, b: &str) -> Ordering {
    // Lowercase before uppercase on case-insensitive ties.
    UniCase::new(a).cmp(&UniCase::new(b)).then_with(|| b.cmp(a))
}

fn sort_field<'a>(
    descriptor: &'a SortDescriptor,
    aliases: &'a HashMap<String, String>,
) -> &'a str {
    aliases
        .get(&descriptor.column)
        .map(String::as_str)
        .unwrap_or(descriptor.column.as_str())
}

fn directed(ordering: Ordering, direction: Direction) -> Ordering {
    match direction {
        Direction::Asc => ordering,
        Direction::Desc => ordering.reverse(),
    }
}

/// Compares two records on the descriptor's column.
///
/// The column is first resolved through `aliases`. Numbers compare
/// numerically, dates and timestamps chronologically, and everything else
/// by its text rendering under a case-insensitive collation. When the two
/// values are of different kinds both compare as text. A missing or null
/// value sorts first.
pub fn compare(
    a: &Record,
    b: &Record,
    descriptor: &SortDescriptor,
    aliases: &HashMap<String, String>,
) -> Ordering {
    let field = sort_field(descriptor, aliases);
    let left = SortKey::of(a.get(field));
    let right = SortKey::of(b.get(field));
    let mode = Mode::of([&left, &right]);
    directed(mode.compare(&left, &right), descriptor.direction)
}

/// Sorts records in place. Records comparing equal keep their relative
/// order.
///
/// The comparison kind is chosen once for the whole column: typed when
/// every non-null value is of one kind, text otherwise.
pub fn sort_records(
    records: &mut [&Record],
    descriptor: &SortDescriptor,
    aliases: &HashMap<String, String>,
) {
    let field = sort_field(descriptor, aliases);
    let keys: Vec<SortKey<'_>> = records.iter().map(|r| SortKey::of(r.get(field))).collect();
    let mode = Mode::of(&keys);
    records.sort_by(|a, b| {
        let left = SortKey::of(a.get(field));
        let right = SortKey::of(b.get(field));
        directed(mode.compare(&left, &right), descriptor.direction)
    });
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn ids(records: &[&Record]) -> Vec<String> {
        records.iter().map(|r| r.id().to_string()).collect()
    }

    #[test]
    fn test_toggle() {
        let mut sort = SortDescriptor::asc("first_name");
        sort.toggle("first_name");
        assert_eq!(sort, SortDescriptor::desc("first_name"));
        sort.toggle("email");
        assert_eq!(sort, SortDescriptor::asc("email"));
    }

    #[test]
    fn test_numbers_compare_numerically() {
        let records = [
            Record::new("a").set("fee", 100i64),
            Record::new("b").set("fee", 9.5),
            Record::new("c").set("fee", 20i64),
        ];
        let mut view: Vec<&Record> = records.iter().collect();
        sort_records(&mut view, &SortDescriptor::asc("fee"), &HashMap::new());
        assert_eq!(ids(&view), ["b", "c", "a"]);
    }

    #[test]
    fn test_dates_compare_chronologically() {
        let records = [
            Record::new("a").set("admission_date", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            Record::new("b").set("admission_date", NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()),
        ];
        let mut view: Vec<&Record> = records.iter().collect();
        sort_records(&mut view, &SortDescriptor::desc("admission_date"), &HashMap::new());
        assert_eq!(ids(&view), ["a", "b"]);
    }

    #[test]
    fn test_text_collation_and_missing_values() {
        let records = [
            Record::new("a").set("name", "beta"),
            Record::new("b").set("name", "Alpha"),
            Record::new("c"),
            Record::new("d").set("name", "alpha"),
        ];
        let mut view: Vec<&Record> = records.iter().collect();
        sort_records(&mut view, &SortDescriptor::asc("name"), &HashMap::new());
        assert_eq!(ids(&view), ["c", "d", "b", "a"]);
    }

    #[test]
    fn test_lists_sort_by_joined_text() {
        let records = [
            Record::new("a").set("program_names", vec!["Chess".to_string()]),
            Record::new("b").set("program_names", vec!["Art".to_string(), "Music".to_string()]),
        ];
        let mut view: Vec<&Record> = records.iter().collect();
        sort_records(&mut view, &SortDescriptor::asc("program_names"), &HashMap::new());
        assert_eq!(ids(&view), ["b", "a"]);
    }

    #[test]
    fn test_alias_resolves_column() {
        let aliases = HashMap::from([("gender".to_string(), "gender_label".to_string())]);
        let records = [
            Record::new("a").set("gender", "F").set("gender_label", "Female"),
            Record::new("b").set("gender", "M").set("gender_label", "Male"),
            Record::new("c").set("gender", "A").set("gender_label", "Undisclosed"),
        ];
        let mut view: Vec<&Record> = records.iter().collect();
        sort_records(&mut view, &SortDescriptor::asc("gender"), &aliases);
        assert_eq!(ids(&view), ["a", "b", "c"]);
    }

    #[test]
    fn test_mixed_kinds_sort_as_text() {
        let records = [
            Record::new("a").set("grade", 100i64),
            Record::new("b").set("grade", 9i64),
            Record::new("c").set("grade", "50"),
            Record::new("d"),
        ];
        let asc = SortDescriptor::asc("grade");
        let mut view: Vec<&Record> = records.iter().collect();
        sort_records(&mut view, &asc, &HashMap::new());
        assert_eq!(ids(&view), ["d", "a", "c", "b"]);

        let mut shuffled: Vec<&Record> = records.iter().rev().collect();
        sort_records(&mut shuffled, &asc, &HashMap::new());
        assert_eq!(ids(&shuffled), ids(&view));

        sort_records(&mut shuffled, &SortDescriptor::desc("grade"), &HashMap::new());
        let mut reversed = ids(&view);
        reversed.reverse();
        assert_eq!(ids(&shuffled), reversed);
    }

    #[test]
    fn test_nulls_lead_a_numeric_column() {
        let records = [
            Record::new("a").set("fee", 100i64),
            Record::new("b").set("fee", Value::Null),
            Record::new("c").set("fee", 9i64),
        ];
        let mut view: Vec<&Record> = records.iter().collect();
        sort_records(&mut view, &SortDescriptor::asc("fee"), &HashMap::new());
        assert_eq!(ids(&view), ["b", "c", "a"]);
    }

    #[test]
    fn test_stable_on_equal_keys() {
        let records = [
            Record::new("a").set("status", "active"),
            Record::new("b").set("status", "inactive"),
            Record::new("c").set("status", "active"),
        ];
        let mut view: Vec<&Record> = records.iter().collect();
        sort_records(&mut view, &SortDescriptor::asc("status"), &HashMap::new());
        assert_eq!(ids(&view), ["a", "c", "b"]);
        sort_records(&mut view, &SortDescriptor::desc("status"), &HashMap::new());
        assert_eq!(ids(&view), ["b", "a", "c"]);
    }
}
