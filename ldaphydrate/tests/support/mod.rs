//! Shared fixtures for the hydration integration tests.
#![allow(dead_code)]

use ldaphydrate::{ConnectionConfig, ConverterOptions, ConverterRegistry, ObjectSchema};
use serde_json::json;

pub const USERS_CONTAINER: &str = "ou=users,dc=example,dc=com";
pub const JDOE_DN: &str = "cn=jdoe,ou=users,dc=example,dc=com";

pub fn registry() -> ConverterRegistry {
    ConverterRegistry::with_builtins()
}

pub fn flag_options() -> ConverterOptions {
    let mut options = ConverterOptions::new();
    options.insert(
        "flags".into(),
        json!({"disabled": 2, "enabled": 2, "passwordNeverExpires": 65536, "smartcardRequired": 262144}),
    );
    options.insert("default_value".into(), json!(512));
    options.insert("invert".into(), json!(["enabled"]));
    options
}

pub fn user_schema() -> ObjectSchema {
    ObjectSchema::new("user")
        .with_attribute("name", "cn")
        .with_attribute("firstName", "givenName")
        .with_attribute("lastName", "sn")
        .with_attribute("emailAddress", "mail")
        .with_attribute("description", "description")
        .with_attribute("disabled", "userAccountControl")
        .with_attribute("passwordNeverExpires", "userAccountControl")
        .with_attribute("smartcardRequired", "userAccountControl")
        .with_attribute("accountExpirationDate", "accountExpires")
        .with_attribute("created", "whenCreated")
        .with_attribute("password", "unicodePwd")
        .with_attribute("groups", "memberOf")
        .with_converter("flags", ["disabled", "passwordNeverExpires", "smartcardRequired"])
        .with_converter("windows_time", ["accountExpirationDate"])
        .with_converter("generalized_time", ["created"])
        .with_converter("encode_windows_password", ["password"])
        .with_converter("group_membership", ["groups"])
        .with_converter_options("flags", "_default", flag_options())
        .with_default_container(USERS_CONTAINER)
}

pub fn connection() -> ConnectionConfig {
    ConnectionConfig::new("example.com")
        .with_root_attribute("defaultNamingContext", "dc=example,dc=com")
        .with_root_attribute("configurationNamingContext", "cn=Configuration,dc=example,dc=com")
}
