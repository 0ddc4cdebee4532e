#![forbid(unsafe_code)]

use super::*;

// Read-only corruption counters. Soft-deleted rows still occupy intervals, so
// they are included. Rows with unassigned bounds count as oddness; the other
// checks skip them since NULL comparisons cannot match.
impl NestedSetStore {
    pub fn count_errors(&self, scope: &ScopeId) -> Result<ErrorCounts, StoreError> {
        let oddness = self.count(
            "SELECT COUNT(1) FROM nodes \
             WHERE scope=?1 AND (lft IS NULL OR rgt IS NULL OR lft >= rgt OR (rgt - lft) % 2 = 0)",
            scope,
        )?;

        let duplicates = self.count(
            "SELECT COUNT(1) FROM nodes n1 \
             JOIN nodes n2 ON n2.scope = n1.scope AND n2.id > n1.id \
               AND (n2.lft = n1.lft OR n2.rgt = n1.rgt OR n2.lft = n1.rgt OR n2.rgt = n1.lft) \
             WHERE n1.scope=?1",
            scope,
        )?;

        // The claimed parent must be the immediate container: it strictly
        // contains the child and no third node sits strictly between them.
        let wrong_parent = self.count(
            "SELECT COUNT(1) FROM nodes c \
             JOIN nodes p ON p.scope = c.scope AND p.id = c.parent_id \
             WHERE c.scope=?1 AND ( \
               NOT (p.lft < c.lft AND c.rgt < p.rgt) \
               OR EXISTS ( \
                 SELECT 1 FROM nodes m \
                 WHERE m.scope = c.scope AND m.id <> c.id AND m.id <> p.id \
                   AND m.lft > p.lft AND m.rgt < p.rgt \
                   AND m.lft < c.lft AND m.rgt > c.rgt))",
            scope,
        )?;

        let missing_parent = self.count(
            "SELECT COUNT(1) FROM nodes c \
             WHERE c.scope=?1 AND c.parent_id IS NOT NULL \
               AND NOT EXISTS (SELECT 1 FROM nodes p WHERE p.scope = c.scope AND p.id = c.parent_id)",
            scope,
        )?;

        Ok(ErrorCounts {
            oddness,
            duplicates,
            wrong_parent,
            missing_parent,
        })
    }

    pub fn total_errors(&self, scope: &ScopeId) -> Result<i64, StoreError> {
        Ok(self.count_errors(scope)?.total())
    }

    pub fn is_broken(&self, scope: &ScopeId) -> Result<bool, StoreError> {
        Ok(self.count_errors(scope)?.is_broken())
    }

    fn count(&self, sql: &str, scope: &ScopeId) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row(sql, params![scope.as_str()], |row| row.get(0))?)
    }
}
