use colored::Colorize;
use tldscout_core::{DomainResult, ProgressSnapshot, RegistryDirectory, ServiceStatus};

pub struct HumanFormatter {
    use_colors: bool,
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self { use_colors: true }
    }

    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    fn label(&self, text: &str) -> String {
        if self.use_colors {
            text.bright_cyan().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn value(&self, text: &str) -> String {
        if self.use_colors {
            text.bright_white().to_string()
        } else {
            text.to_string()
        }
    }

    fn success(&self, text: &str) -> String {
        if self.use_colors {
            text.bright_green().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn warning(&self, text: &str) -> String {
        if self.use_colors {
            text.bright_yellow().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn error(&self, text: &str) -> String {
        if self.use_colors {
            text.bright_red().bold().to_string()
        } else {
            text.to_string()
        }
    }

    fn header(&self, text: &str) -> String {
        if self.use_colors {
            format!("\n{}\n{}", text.bright_blue().bold(), "─".repeat(text.len()).dimmed())
        } else {
            format!("\n{}\n{}", text, "-".repeat(text.len()))
        }
    }

    fn field(&self, output: &mut Vec<String>, label: &str, value: Option<&str>) {
        if let Some(value) = value {
            output.push(format!("  {}: {}", self.label(label), self.value(value)));
        }
    }

    pub fn format_result(&self, result: &DomainResult) -> String {
        let mut output = vec![self.header(&result.domain)];

        let Some(record) = &result.data else {
            output.push(format!(
                "  {} {}",
                self.error("✗"),
                result.error.as_deref().unwrap_or("no registry data")
            ));
            return output.join("\n");
        };

        let registrant = &record.registrant;
        self.field(&mut output, "Name", registrant.name.as_deref());
        self.field(&mut output, "Organization", registrant.organization.as_deref());
        self.field(&mut output, "Email", registrant.email.as_deref());
        self.field(&mut output, "Phone", registrant.phone.as_deref());
        self.field(&mut output, "Country", registrant.country.as_deref());
        self.field(&mut output, "Status", record.status.as_deref());

        if let Some(registered) = record.registration_date {
            output.push(format!(
                "  {}: {}",
                self.label("Registered"),
                self.value(&registered.format("%Y-%m-%d").to_string())
            ));
        }

        if !record.nameservers.is_empty() {
            output.push(format!("  {}:", self.label("Nameservers")));
            for ns in &record.nameservers {
                output.push(format!("    {}", self.value(ns)));
            }
        }

        output.join("\n")
    }

    pub fn format_summary(&self, progress: &ProgressSnapshot) -> String {
        let failed = progress.failed.to_string();
        format!(
            "{}\n  {}: {}\n  {}: {}\n  {}: {}",
            self.header("Summary"),
            self.label("Domains"),
            self.value(&progress.total.to_string()),
            self.label("Enriched"),
            self.success(&progress.successful.to_string()),
            self.label("Failed"),
            if progress.failed > 0 {
                self.error(&failed)
            } else {
                self.value(&failed)
            }
        )
    }

    pub fn format_status(&self, services: &[ServiceStatus]) -> String {
        let mut output = vec![self.header("Registry services")];

        for service in services {
            let state = if service.rate_limited {
                self.warning(&format!(
                    "rate limited ({}s remaining)",
                    service.remaining_cooldown_seconds
                ))
            } else {
                self.success("ok")
            };
            output.push(format!("  {} {}", self.value(&service.service_url), state));
        }

        output.join("\n")
    }

    pub fn format_directory(&self, directory: &RegistryDirectory) -> String {
        let mut output = vec![self.header("Primary registry services")];
        for (tld, endpoint) in directory.primaries() {
            output.push(format!("  {:<8} {}", self.label(tld), self.value(&endpoint.base_url)));
        }

        output.push(self.header("Generic services"));
        output.push(format!(
            "  {:<8} {}",
            self.label("default"),
            self.value(&directory.default_primary().base_url)
        ));
        for (i, endpoint) in directory.fallbacks().iter().enumerate() {
            output.push(format!(
                "  {:<8} {}",
                self.label(&format!("fb{}", i + 1)),
                self.value(&endpoint.base_url)
            ));
        }

        output.join("\n")
    }
}
