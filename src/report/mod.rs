//! Reachability reports for the stripping tool.
//!
//! Partitions one module's definitions into reachable and unreachable
//! sets after an analysis run. The unreachable side is exactly what a
//! downstream trimmer may delete from the compiled binary.

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::io::Write;

use crate::analysis::RapidTypeAnalysis;
use crate::program::{ModuleId, WholeProgram};

/// Output format for reports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Reachable/unreachable partition of one module, as identifier strings
#[derive(Debug, Clone, Serialize)]
pub struct ModuleReport {
    pub module: String,

    pub reachable_types: Vec<String>,
    pub unreachable_types: Vec<String>,

    pub reachable_methods: Vec<String>,
    pub unreachable_methods: Vec<String>,

    pub reachable_fields: Vec<String>,
    pub unreachable_fields: Vec<String>,
}

impl ModuleReport {
    /// Partition a module against a finished analysis run
    pub fn from_analysis(
        program: &WholeProgram,
        module: ModuleId,
        analysis: &RapidTypeAnalysis,
    ) -> Self {
        debug_assert!(analysis.finished());

        let mut report = Self {
            module: program.module(module).name.clone(),
            reachable_types: Vec::new(),
            unreachable_types: Vec::new(),
            reachable_methods: Vec::new(),
            unreachable_methods: Vec::new(),
            reachable_fields: Vec::new(),
            unreachable_fields: Vec::new(),
        };

        for &ty in &program.module(module).types {
            let id_string = program.id_string_for_type(ty);
            if analysis.type_is_reachable(ty) {
                report.reachable_types.push(id_string);
            } else {
                report.unreachable_types.push(id_string);
            }

            for &method in &program.type_def(ty).methods {
                // Abstract methods carry no code for the trimmer to keep
                // or delete.
                if program.method(method).is_abstract {
                    continue;
                }
                let id_string = program.id_string_for_method(method);
                if analysis.method_is_reachable(method) {
                    report.reachable_methods.push(id_string);
                } else {
                    report.unreachable_methods.push(id_string);
                }
            }

            for &field in &program.type_def(ty).fields {
                let id_string = program.id_string_for_field(field);
                if analysis.field_is_reachable(field) {
                    report.reachable_fields.push(id_string);
                } else {
                    report.unreachable_fields.push(id_string);
                }
            }
        }

        for list in [
            &mut report.reachable_types,
            &mut report.unreachable_types,
            &mut report.reachable_methods,
            &mut report.unreachable_methods,
            &mut report.reachable_fields,
            &mut report.unreachable_fields,
        ] {
            list.sort();
        }

        report
    }

    pub fn total_types(&self) -> usize {
        self.reachable_types.len() + self.unreachable_types.len()
    }

    pub fn total_methods(&self) -> usize {
        self.reachable_methods.len() + self.unreachable_methods.len()
    }

    pub fn total_fields(&self) -> usize {
        self.reachable_fields.len() + self.unreachable_fields.len()
    }
}

/// Renders module reports in the configured format
pub struct Reporter {
    format: ReportFormat,
}

impl Reporter {
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    pub fn write(&self, report: &ModuleReport, out: &mut dyn Write) -> Result<()> {
        match self.format {
            ReportFormat::Text => self.write_text(report, out),
            ReportFormat::Json => {
                serde_json::to_writer_pretty(&mut *out, report).into_diagnostic()?;
                writeln!(out).into_diagnostic()
            }
        }
    }

    fn write_text(&self, report: &ModuleReport, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "Module: {}", report.module).into_diagnostic()?;
        writeln!(
            out,
            "UnusedTypesCount\t{}\nUnusedMethodsCount\t{}\nUnusedFieldsCount\t{}",
            report.unreachable_types.len(),
            report.unreachable_methods.len(),
            report.unreachable_fields.len()
        )
        .into_diagnostic()?;
        writeln!(
            out,
            "TotalTypesCount\t{}\nTotalMethodsCount\t{}\nTotalFieldsCount\t{}",
            report.total_types(),
            report.total_methods(),
            report.total_fields()
        )
        .into_diagnostic()?;

        for (header, entries) in [
            ("Unreachable types:", &report.unreachable_types),
            ("Unreachable methods:", &report.unreachable_methods),
            ("Unreachable fields:", &report.unreachable_fields),
        ] {
            writeln!(out, "{}", header).into_diagnostic()?;
            for entry in entries {
                writeln!(out, "  {}", entry).into_diagnostic()?;
            }
        }

        Ok(())
    }
}
