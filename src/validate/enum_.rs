use std::collections::{hash_map, HashMap};

use super::{join, overlaps, Context};
use crate::{
    case::enum_value_camel_case,
    descriptor::EnumDescriptor,
    diagnostic::{CheckError, Severity},
    index_to_i32, tag,
    types::{feature_set::JsonFormat, field_options::OptionTargetType},
    Error,
};

impl<'a> Context<'a> {
    pub(super) fn check_enum(&mut self, enum_: &EnumDescriptor) -> Result<(), Error> {
        let proto = enum_.descriptor_proto();
        let path = enum_.path();
        let options = proto.options.as_ref();

        self.check_features(
            options.and_then(|options| options.features.as_ref()),
            OptionTargetType::TargetTypeEnum,
            &join(path, &[tag::enum_::OPTIONS, 7]),
        )?;

        if let Some(first) = enum_.values().next() {
            if first.number() != 0 {
                let name = enum_.full_name().to_owned();
                let err = if self.is_proto3() {
                    Some(CheckError::Proto3EnumFirstValueNotZero { name })
                } else if self.is_editions() && !enum_.is_closed() {
                    Some(CheckError::OpenEnumFirstValueNotZero { name })
                } else {
                    None
                };
                if let Some(err) = err {
                    self.error(err, &join(first.path(), &[tag::enum_value::NUMBER]))?;
                }
            }
        }

        let mut reserved = Vec::new();
        for (i, range) in proto.reserved_range.iter().enumerate() {
            let (start, end) = match (range.start, range.end) {
                (Some(start), Some(end)) => (i64::from(start), i64::from(end)),
                _ => continue,
            };
            let range_path = join(path, &[tag::enum_::RESERVED_RANGE, index_to_i32(i)]);
            if end < start {
                self.error(
                    CheckError::InvalidRange {
                        kind: "reserved",
                        start,
                        end,
                    },
                    &range_path,
                )?;
                continue;
            }

            for (first_start, first_end) in &reserved {
                if overlaps((*first_start, *first_end), (start, end)) {
                    self.error(
                        CheckError::Overlap {
                            first: describe_range(*first_start, *first_end),
                            second: describe_range(start, end),
                        },
                        &range_path,
                    )?;
                }
            }
            reserved.push((start, end));
        }

        let allow_alias = options.map_or(false, |options| options.allow_alias());
        let json_severity = match enum_.features().json_format() {
            JsonFormat::Allow => Severity::Error,
            _ => Severity::Warning,
        };
        let check_camel_case = !options.map_or(false, |options| {
            options.deprecated_legacy_json_field_conflicts()
        });

        let mut numbers: HashMap<i32, String> = HashMap::new();
        let mut camel_case_names: HashMap<String, (String, i32)> = HashMap::new();
        let mut has_alias = false;
        for value in enum_.values() {
            let number = value.number();
            let value_path = value.path();

            self.check_features(
                value
                    .descriptor_proto()
                    .options
                    .as_ref()
                    .and_then(|options| options.features.as_ref()),
                OptionTargetType::TargetTypeEnumEntry,
                &join(value_path, &[tag::enum_value::OPTIONS, 2]),
            )?;

            if reserved
                .iter()
                .any(|&range| overlaps(range, (i64::from(number), i64::from(number))))
            {
                self.error(
                    CheckError::ReservedEnumValueNumber {
                        name: value.name().to_owned(),
                        number,
                    },
                    &join(value_path, &[tag::enum_value::NUMBER]),
                )?;
            }
            if proto.reserved_name.iter().any(|name| name == value.name()) {
                self.error(
                    CheckError::ReservedEnumValueName {
                        name: value.name().to_owned(),
                    },
                    &join(value_path, &[tag::enum_value::NAME]),
                )?;
            }

            match numbers.entry(number) {
                hash_map::Entry::Occupied(first) => {
                    has_alias = true;
                    if !allow_alias {
                        self.error(
                            CheckError::DuplicateEnumNumber {
                                name: value.name().to_owned(),
                                number,
                                first: first.get().clone(),
                            },
                            &join(value_path, &[tag::enum_value::NUMBER]),
                        )?;
                    }
                }
                hash_map::Entry::Vacant(entry) => {
                    entry.insert(value.name().to_owned());
                }
            }

            if check_camel_case {
                let camel_case = enum_value_camel_case(enum_.name(), value.name());
                match camel_case_names.get(&camel_case) {
                    Some((first, first_number)) => {
                        if !(allow_alias && *first_number == number) {
                            let err = CheckError::EnumValueCamelCaseConflict {
                                name: value.name().to_owned(),
                                first: first.clone(),
                                camel_case,
                            };
                            self.report(
                                json_severity,
                                err,
                                &join(value_path, &[tag::enum_value::NAME]),
                            )?;
                        }
                    }
                    None => {
                        camel_case_names.insert(camel_case, (value.name().to_owned(), number));
                    }
                }
            }
        }

        if allow_alias && !has_alias {
            self.error(
                CheckError::AllowAliasUnused {
                    name: enum_.full_name().to_owned(),
                },
                &join(path, &[tag::enum_::OPTIONS, 2]),
            )?;
        }

        Ok(())
    }
}

fn describe_range(start: i64, end: i64) -> String {
    if start == end {
        format!("reserved number {}", start)
    } else {
        format!("reserved range {} to {}", start, end)
    }
}
