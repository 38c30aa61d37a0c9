//! Column role detection.

use crate::spec::{
    CourseKitError, EnumColumnRole, EnumHeaderMatcher, EnumNameMatch, EnumRoleKind, Result,
    SpecColumnRoles, SpecRoleRules,
};

/// Assign a role to every header without failing.
///
/// Rules run in list order over normalized headers. Every column no rule
/// claims becomes a course column.
pub fn assign_roles(headers: &[String], rules: &SpecRoleRules) -> SpecColumnRoles {
    let mut l_claims: Vec<Option<EnumRoleKind>> = vec![None; headers.len()];
    let mut name_match = None;

    for rule in &rules.rules {
        match rule.role {
            EnumRoleKind::Name | EnumRoleKind::Division => {
                if l_claims.contains(&Some(rule.role)) {
                    continue;
                }
                if let Some(n_idx) = find_unclaimed(headers, &l_claims, &rule.matcher) {
                    l_claims[n_idx] = Some(rule.role);
                    if rule.role == EnumRoleKind::Name {
                        name_match = Some(EnumNameMatch::Rule);
                    }
                }
            }
            EnumRoleKind::Excluded => {
                for (n_idx, c_header) in headers.iter().enumerate() {
                    if l_claims[n_idx].is_none() && rule.matcher.is_match(c_header) {
                        l_claims[n_idx] = Some(EnumRoleKind::Excluded);
                    }
                }
            }
        }
    }

    if name_match.is_none()
        && rules.if_name_fallback_first_column
        && let Some(claim) = l_claims.first_mut()
        && *claim != Some(EnumRoleKind::Division)
    {
        *claim = Some(EnumRoleKind::Name);
        name_match = Some(EnumNameMatch::FirstColumn);
    }

    let mut roles = SpecColumnRoles {
        roles: Vec::with_capacity(headers.len()),
        name_column: None,
        name_match,
        division_column: None,
        course_columns: Vec::new(),
    };
    for (c_header, claim) in headers.iter().zip(l_claims) {
        let role = match claim {
            Some(EnumRoleKind::Name) => {
                roles.name_column = Some(c_header.clone());
                EnumColumnRole::Name
            }
            Some(EnumRoleKind::Division) => {
                roles.division_column = Some(c_header.clone());
                EnumColumnRole::Division
            }
            Some(EnumRoleKind::Excluded) => EnumColumnRole::Ignored,
            None => {
                roles.course_columns.push(c_header.clone());
                EnumColumnRole::Course(c_header.clone())
            }
        };
        roles.roles.push((c_header.clone(), role));
    }

    roles
}

/// Position of the first unclaimed header, in header order, a matcher selects.
fn find_unclaimed(
    headers: &[String],
    l_claims: &[Option<EnumRoleKind>],
    matcher: &EnumHeaderMatcher,
) -> Option<usize> {
    (0..headers.len())
        .filter(|n_idx| l_claims[*n_idx].is_none())
        .find(|n_idx| matcher.is_match(&headers[*n_idx]))
}

/// Assign roles and require at least one course column.
pub fn detect_roles(headers: &[String], rules: &SpecRoleRules) -> Result<SpecColumnRoles> {
    let roles = assign_roles(headers, rules);
    if roles.course_columns.is_empty() {
        return Err(CourseKitError::NoCourseColumns {
            headers: headers.to_vec(),
        });
    }
    Ok(roles)
}
