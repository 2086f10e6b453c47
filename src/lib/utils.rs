use std::any::type_name;
use std::env::var;
use std::str::FromStr;

use simple_error::bail;

use crate::DynResult;


pub fn parse_env<T: FromStr>(key: &str, default: Option<T>) -> DynResult<T> {
    match var(key) {
        Ok(res) => match res.parse::<T>() {
            Ok(res) => Ok(res),
            Err(_) => bail!("'{key}' should be conversable to {}!", type_name::<T>()),
        },
        Err(_) => match default {
            Some(res) => Ok(res),
            None => bail!("'{key}' should be set!"),
        },
    }
}

pub fn parse_str_env(key: &str, default: Option<&str>) -> DynResult<String> {
    match var(key) {
        Ok(res) => Ok(res),
        Err(_) => match default {
            Some(res) => Ok(res.to_string()),
            None => bail!("'{key}' should be set!"),
        },
    }
}
