// Gradeflow Infrastructure - Grader Adapters
// Implements: GraderClient (reqwest), ResultParser (NUnit XML)

mod http_grader;
mod nunit_parser;

pub use http_grader::ReqwestGraderClient;
pub use nunit_parser::NUnitResultParser;
