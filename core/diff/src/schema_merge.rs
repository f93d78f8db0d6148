//! Three-way schema merge (spec.md §4.6): "Column added on one side: include. Column
//! dropped on one side and untouched on the other: drop. Column type change compatible on
//! both sides (identical) or change on exactly one side to a wider type per a documented
//! widening table: take the wider. PK changes, column renames, incompatible type changes:
//! schema conflict."

use dolt_schema::{CheckDescriptor, ColumnDescriptor, ForeignKeyDescriptor, IndexDescriptor, Schema};

use crate::classify::{classify, Outcome};

/// One irreconcilable difference found while merging a schema. Column-rename detection is
/// out of scope (spec.md §4.6 lists it as a conflict, but without explicit rename tracking
/// a rename is indistinguishable from a drop-and-add, which this function already reports
/// as two separate conflicts rather than one).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaConflict {
    pub entity: &'static str,
    pub name: String,
    pub reason: String,
}

fn union_names<'a, T>(name_of: impl Fn(&T) -> &str, lists: [&'a [T]; 3]) -> Vec<String> {
    let mut names: Vec<String> = lists.iter().flat_map(|l| l.iter().map(|x| name_of(x).to_string())).collect();
    names.sort();
    names.dedup();
    names
}

fn find<'a, T>(name_of: impl Fn(&T) -> &str, list: &'a [T], name: &str) -> Option<&'a T> {
    list.iter().find(|x| name_of(x) == name)
}

fn merge_columns(
    base: &[ColumnDescriptor],
    ours: &[ColumnDescriptor],
    theirs: &[ColumnDescriptor],
    conflicts: &mut Vec<SchemaConflict>,
) -> Vec<ColumnDescriptor> {
    let name_of = |c: &ColumnDescriptor| c.name.as_str();
    let mut merged = Vec::new();
    for name in union_names(name_of, [base, ours, theirs]) {
        let b = find(name_of, base, &name);
        let o = find(name_of, ours, &name);
        let t = find(name_of, theirs, &name);
        match classify(b, o, t) {
            Outcome::Resolved(Some(col)) => merged.push(col),
            Outcome::Resolved(None) => {}
            Outcome::Conflict => match (o, t) {
                (Some(oo), Some(tt)) if oo.pk_position == tt.pk_position => {
                    match dolt_schema::widen(&oo.col_type, &tt.col_type) {
                        Some(widened) if oo.default == tt.default => merged.push(ColumnDescriptor {
                            name: oo.name.clone(),
                            col_type: widened,
                            pk_position: oo.pk_position,
                            nullable: oo.nullable || tt.nullable,
                            default: oo.default.clone(),
                            auto_increment: oo.auto_increment || tt.auto_increment,
                        }),
                        Some(_) => conflicts.push(SchemaConflict {
                            entity: "column",
                            name,
                            reason: "default value changed differently on both sides".to_string(),
                        }),
                        None => conflicts.push(SchemaConflict {
                            entity: "column",
                            name,
                            reason: "incompatible type change on both sides".to_string(),
                        }),
                    }
                }
                (Some(_), Some(_)) => {
                    conflicts.push(SchemaConflict { entity: "column", name, reason: "primary key position changed".to_string() })
                }
                _ => conflicts.push(SchemaConflict {
                    entity: "column",
                    name,
                    reason: "modified on one side and dropped on the other".to_string(),
                }),
            },
        }
    }
    merged.sort_by_key(|c| (c.pk_position.is_none(), c.pk_position));
    merged
}

fn merge_simple<T: Clone + PartialEq>(
    entity: &'static str,
    name_of: impl Fn(&T) -> &str,
    base: &[T],
    ours: &[T],
    theirs: &[T],
    conflicts: &mut Vec<SchemaConflict>,
) -> Vec<T> {
    let mut merged = Vec::new();
    for name in union_names(&name_of, [base, ours, theirs]) {
        let b = find(&name_of, base, &name);
        let o = find(&name_of, ours, &name);
        let t = find(&name_of, theirs, &name);
        match classify(b, o, t) {
            Outcome::Resolved(Some(item)) => merged.push(item),
            Outcome::Resolved(None) => {}
            Outcome::Conflict => conflicts.push(SchemaConflict { entity, name, reason: "changed differently on both sides".to_string() }),
        }
    }
    merged
}

/// Merges `ours` and `theirs` against their common `base`. Returns the merged schema, or
/// the full list of conflicts found (spec.md §4.6: "if schemas are incompatible, report a
/// schema conflict and do not touch rows").
pub fn merge_schema(base: &Schema, ours: &Schema, theirs: &Schema) -> Result<Schema, Vec<SchemaConflict>> {
    let mut conflicts = Vec::new();
    let columns = merge_columns(&base.columns, &ours.columns, &theirs.columns, &mut conflicts);
    let indexes =
        merge_simple("index", |i: &IndexDescriptor| i.name.as_str(), &base.indexes, &ours.indexes, &theirs.indexes, &mut conflicts);
    let checks =
        merge_simple("check", |c: &CheckDescriptor| c.name.as_str(), &base.checks, &ours.checks, &theirs.checks, &mut conflicts);
    let foreign_keys = merge_simple(
        "foreign_key",
        |f: &ForeignKeyDescriptor| f.name.as_str(),
        &base.foreign_keys,
        &ours.foreign_keys,
        &theirs.foreign_keys,
        &mut conflicts,
    );

    if conflicts.is_empty() {
        Ok(Schema { columns, indexes, checks, foreign_keys })
    } else {
        Err(conflicts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dolt_schema::ColumnType;

    fn col(name: &str, ty: ColumnType, pk: Option<u32>) -> ColumnDescriptor {
        ColumnDescriptor { name: name.to_string(), col_type: ty, pk_position: pk, nullable: false, default: None, auto_increment: false }
    }

    fn schema(columns: Vec<ColumnDescriptor>) -> Schema {
        Schema { columns, ..Schema::default() }
    }

    #[test]
    fn identical_schemas_merge_to_themselves() {
        let s = schema(vec![col("id", ColumnType::Int32, Some(0))]);
        assert_eq!(merge_schema(&s, &s, &s).unwrap(), s);
    }

    #[test]
    fn a_column_added_on_one_side_is_included() {
        let base = schema(vec![col("id", ColumnType::Int32, Some(0))]);
        let ours = schema(vec![col("id", ColumnType::Int32, Some(0)), col("name", ColumnType::Varchar(10), None)]);
        let merged = merge_schema(&base, &ours, &base).unwrap();
        assert!(merged.column("name").is_some());
    }

    #[test]
    fn a_column_dropped_on_one_side_and_untouched_on_the_other_is_dropped() {
        let base = schema(vec![col("id", ColumnType::Int32, Some(0)), col("name", ColumnType::Varchar(10), None)]);
        let ours = schema(vec![col("id", ColumnType::Int32, Some(0))]);
        let merged = merge_schema(&base, &ours, &base).unwrap();
        assert!(merged.column("name").is_none());
    }

    #[test]
    fn a_type_widened_on_one_side_takes_the_wider_type() {
        let base = schema(vec![col("n", ColumnType::Int16, Some(0))]);
        let ours = schema(vec![col("n", ColumnType::Int64, Some(0))]);
        let merged = merge_schema(&base, &ours, &base).unwrap();
        assert_eq!(merged.column("n").unwrap().col_type, ColumnType::Int64);
    }

    #[test]
    fn incompatible_type_changes_on_both_sides_conflict() {
        let base = schema(vec![col("n", ColumnType::Int16, Some(0))]);
        let ours = schema(vec![col("n", ColumnType::Int64, Some(0))]);
        let theirs = schema(vec![col("n", ColumnType::Varchar(10), Some(0))]);
        let conflicts = merge_schema(&base, &ours, &theirs).unwrap_err();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].entity, "column");
    }

    #[test]
    fn a_default_changed_differently_on_both_sides_conflicts() {
        let mut base_col = col("n", ColumnType::Int32, Some(0));
        base_col.default = Some(vec![0]);
        let mut ours_col = base_col.clone();
        ours_col.default = Some(vec![1]);
        let mut theirs_col = base_col.clone();
        theirs_col.default = Some(vec![2]);

        let base = schema(vec![base_col]);
        let ours = schema(vec![ours_col]);
        let theirs = schema(vec![theirs_col]);
        let conflicts = merge_schema(&base, &ours, &theirs).unwrap_err();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].entity, "column");
        assert_eq!(conflicts[0].reason, "default value changed differently on both sides");
    }

    #[test]
    fn primary_key_position_change_is_a_conflict() {
        let base = schema(vec![col("id", ColumnType::Int32, Some(0))]);
        let ours = schema(vec![col("id", ColumnType::Int32, Some(0))]);
        let theirs = schema(vec![col("id", ColumnType::Int32, None)]);
        assert!(merge_schema(&base, &ours, &theirs).is_err());
    }
}
