//! Navigable routes: `/`, `/admin`, `/part/{part}`

use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;
use crate::models::Part;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Landing,
    Admin,
    Part(Part),
}

impl Route {
    /// Routes offered on the landing page, in display order
    pub fn landing_links() -> [Route; 3] {
        [
            Route::Part(Part::Part1),
            Route::Part(Part::Part2),
            Route::Part(Part::Part3),
        ]
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Landing => f.write_str("/"),
            Route::Admin => f.write_str("/admin"),
            Route::Part(part) => write!(f, "/part/{}", part),
        }
    }
}

impl FromStr for Route {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = s.trim().trim_end_matches('/');
        match path {
            "" => Ok(Route::Landing),
            "/admin" => Ok(Route::Admin),
            _ => match path.strip_prefix("/part/") {
                Some(part) => Ok(Route::Part(part.parse()?)),
                None => Err(ClientError::Validation(format!("Unknown route: {}", s))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_roundtrip() {
        for route in [Route::Landing, Route::Admin, Route::Part(Part::Part3)] {
            assert_eq!(route.to_string().parse::<Route>().unwrap(), route);
        }
        assert_eq!(Route::Part(Part::Part1).to_string(), "/part/part1");
    }

    #[test]
    fn test_route_parse_edges() {
        assert_eq!("/admin/".parse::<Route>().unwrap(), Route::Admin);
        assert!("/part/part9".parse::<Route>().is_err());
        assert!("/settings".parse::<Route>().is_err());
    }

    #[test]
    fn test_landing_links_cover_every_part() {
        let links: Vec<String> = Route::landing_links().iter().map(|r| r.to_string()).collect();
        assert_eq!(links, vec!["/part/part1", "/part/part2", "/part/part3"]);
    }
}
