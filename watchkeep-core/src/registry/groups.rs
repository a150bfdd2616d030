use super::*;

impl Registry {
    /// Names of the groups listing `service` (case-insensitive match), in group order.
    pub fn groups_of(&self, service: &str) -> Vec<&str> {
        self.groups
            .iter()
            .filter(|g| g.members.iter().any(|m| m.eq_ignore_ascii_case(service)))
            .map(|g| g.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::models::ServiceGroup;
    use crate::registry::tests::sample_registry;

    #[test]
    fn membership_is_case_insensitive() {
        let mut registry = sample_registry();
        registry.add_group(ServiceGroup {
            name: "web".into(),
            members: vec!["NGINX".into()],
        });
        registry.add_group(ServiceGroup {
            name: "db".into(),
            members: vec!["postgres".into()],
        });
        registry.add_group(ServiceGroup {
            name: "frontline".into(),
            members: vec!["nginx".into(), "localhost".into()],
        });

        assert_eq!(registry.groups_of("nginx"), ["web", "frontline"]);
        assert_eq!(registry.groups_of("postgres"), ["db"]);
        assert!(registry.groups_of("rootfs").is_empty());
    }
}
