use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Resource {
    Users,
    Roles,
    Leads,
    Opportunities,
    Quotations,
    Companies,
    Partners,
    Services,
    MasterData,
    Activity,
    Exports,
    Attachments,
}

impl Resource {
    pub const ALL: [Resource; 12] = [
        Resource::Users,
        Resource::Roles,
        Resource::Leads,
        Resource::Opportunities,
        Resource::Quotations,
        Resource::Companies,
        Resource::Partners,
        Resource::Services,
        Resource::MasterData,
        Resource::Activity,
        Resource::Exports,
        Resource::Attachments,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Users => "users",
            Resource::Roles => "roles",
            Resource::Leads => "leads",
            Resource::Opportunities => "opportunities",
            Resource::Quotations => "quotations",
            Resource::Companies => "companies",
            Resource::Partners => "partners",
            Resource::Services => "services",
            Resource::MasterData => "master_data",
            Resource::Activity => "activity",
            Resource::Exports => "exports",
            Resource::Attachments => "attachments",
        }
    }

    /// Actions that exist for this resource
    pub fn actions(&self) -> &'static [Action] {
        use Action::*;
        match self {
            Resource::Leads => &[View, Create, Edit, Delete, Approve],
            Resource::Opportunities => &[View, Create, Edit, Delete, Override],
            Resource::Quotations => &[View, Create, Edit, Delete, Approve, Export],
            Resource::Activity => &[View],
            Resource::Exports => &[Export],
            _ => &[View, Create, Edit, Delete],
        }
    }

    /// Resources handled day to day by the sales team
    fn is_sales(&self) -> bool {
        matches!(
            self,
            Resource::Leads
                | Resource::Opportunities
                | Resource::Quotations
                | Resource::Companies
                | Resource::Partners
                | Resource::Attachments
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Action {
    View,
    Create,
    Edit,
    Delete,
    Approve,
    Override,
    Export,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Approve => "approve",
            Action::Override => "override",
            Action::Export => "export",
        }
    }
}

/// A `resource:action` permission code
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Permission {
    pub resource: Resource,
    pub action: Action,
}

impl Permission {
    pub const fn new(resource: Resource, action: Action) -> Self {
        Self { resource, action }
    }

    pub fn code(&self) -> String {
        self.to_string()
    }

    pub fn description(&self) -> String {
        format!("{} {}", self.action.as_str(), self.resource.as_str().replace('_', " "))
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource.as_str(), self.action.as_str())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        catalog()
            .into_iter()
            .find(|p| p.to_string() == s.trim())
            .ok_or_else(|| format!("unknown permission '{s}'"))
    }
}

/// Every permission the system knows about
pub fn catalog() -> Vec<Permission> {
    Resource::ALL
        .iter()
        .flat_map(|resource| {
            resource
                .actions()
                .iter()
                .map(move |action| Permission::new(*resource, *action))
        })
        .collect()
}

pub const ADMIN_ROLE: &str = "admin";
pub const EXECUTIVE_ROLE: &str = "executive";
pub const MANAGER_ROLE: &str = "manager";
pub const SALES_ROLE: &str = "sales";

/// Seeded role definitions: (name, description, permissions)
pub fn system_roles() -> Vec<(&'static str, &'static str, BTreeSet<Permission>)> {
    let all = catalog();
    let pick = |keep: &dyn Fn(&Permission) -> bool| -> BTreeSet<Permission> {
        all.iter().copied().filter(|p| keep(p)).collect()
    };

    let admin = pick(&|_| true);
    let executive = pick(&|p| {
        matches!(p.action, Action::View | Action::Export)
            || *p == Permission::new(Resource::Leads, Action::Approve)
            || *p == Permission::new(Resource::Quotations, Action::Approve)
            || *p == Permission::new(Resource::Opportunities, Action::Override)
    });
    let manager = pick(&|p| {
        (p.resource.is_sales() || p.resource == Resource::Services)
            && matches!(p.action, Action::View | Action::Create | Action::Edit)
            || matches!(p.action, Action::Export)
            || matches!(p.resource, Resource::MasterData | Resource::Activity)
                && p.action == Action::View
            || *p == Permission::new(Resource::Leads, Action::Approve)
            || *p == Permission::new(Resource::Quotations, Action::Approve)
    });
    let sales = pick(&|p| {
        p.resource.is_sales() && matches!(p.action, Action::View | Action::Create | Action::Edit)
            || matches!(
                p.resource,
                Resource::Services | Resource::MasterData | Resource::Activity
            ) && p.action == Action::View
    });

    vec![
        (ADMIN_ROLE, "Full access", admin),
        (EXECUTIVE_ROLE, "Read everything, approve and override", executive),
        (MANAGER_ROLE, "Runs the sales team and approves its work", manager),
        (SALES_ROLE, "Works leads, opportunities and quotations", sales),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(name: &str) -> BTreeSet<Permission> {
        system_roles()
            .into_iter()
            .find(|(n, _, _)| *n == name)
            .map(|(_, _, perms)| perms)
            .unwrap()
    }

    #[test]
    fn codes_round_trip_through_from_str() {
        let perm: Permission = "quotations:approve".parse().unwrap();
        assert_eq!(perm, Permission::new(Resource::Quotations, Action::Approve));
        assert_eq!(perm.code(), "quotations:approve");
        assert!("quotations:fly".parse::<Permission>().is_err());
        assert!("activity:delete".parse::<Permission>().is_err());
    }

    #[test]
    fn admin_holds_the_whole_catalog() {
        assert_eq!(role(ADMIN_ROLE).len(), catalog().len());
    }

    #[test]
    fn executive_can_override_but_not_create() {
        let exec = role(EXECUTIVE_ROLE);
        assert!(exec.contains(&Permission::new(Resource::Opportunities, Action::Override)));
        assert!(exec.contains(&Permission::new(Resource::Users, Action::View)));
        assert!(!exec.contains(&Permission::new(Resource::Leads, Action::Create)));
    }

    #[test]
    fn sales_cannot_approve_or_touch_users() {
        let sales = role(SALES_ROLE);
        assert!(sales.contains(&Permission::new(Resource::Leads, Action::Create)));
        assert!(sales.contains(&Permission::new(Resource::Services, Action::View)));
        assert!(!sales.contains(&Permission::new(Resource::Leads, Action::Approve)));
        assert!(!sales.contains(&Permission::new(Resource::Quotations, Action::Approve)));
        assert!(!sales.contains(&Permission::new(Resource::Users, Action::View)));
    }

    #[test]
    fn manager_approves_and_exports() {
        let manager = role(MANAGER_ROLE);
        assert!(manager.contains(&Permission::new(Resource::Quotations, Action::Approve)));
        assert!(manager.contains(&Permission::new(Resource::Exports, Action::Export)));
        assert!(!manager.contains(&Permission::new(Resource::Opportunities, Action::Override)));
        assert!(!manager.contains(&Permission::new(Resource::Roles, Action::Edit)));
    }
}
